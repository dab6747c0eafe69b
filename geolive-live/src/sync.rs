//! Fetch-and-reconcile logic for viewer and comment polling.
//!
//! Reconciliation contract: viewers dedup by id (order-preserving),
//! comments are replaced wholesale in ascending timestamp order. A push
//! transport could replace the pollers as long as this contract holds.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use geolive_core::api::{ApiClient, CommentRecord, ViewerEntry};
use geolive_core::cache::ProfileCache;
use geolive_core::models::{Comment, GeoPoint, StreamId, UserId, Viewer};

use crate::feed::{CommentFeed, ViewerRoster};

/// Extract viewer ids (with any attached locations) from the raw backend
/// list, collapsing duplicate ids to the first occurrence.
#[must_use]
pub fn dedup_viewer_refs(entries: &[ViewerEntry]) -> Vec<(UserId, Option<GeoPoint>)> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    for entry in entries {
        if let Some(id) = entry.user_id() {
            if seen.insert(id.clone()) {
                refs.push((id, entry.location()));
            }
        }
    }
    refs
}

/// One poll cycle's worth of reconciliation, shared by the viewer and
/// comment pollers.
pub struct LiveSync {
    api: ApiClient,
    profiles: ProfileCache,
    roster: Arc<ViewerRoster>,
    comments: Arc<CommentFeed>,
}

impl std::fmt::Debug for LiveSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSync")
            .field("api", &self.api)
            .finish()
    }
}

impl LiveSync {
    #[must_use]
    pub fn new(
        api: ApiClient,
        profiles: ProfileCache,
        roster: Arc<ViewerRoster>,
        comments: Arc<CommentFeed>,
    ) -> Self {
        Self {
            api,
            profiles,
            roster,
            comments,
        }
    }

    /// Viewer tick: fetch the stream record, dedup the raw viewer list,
    /// resolve profiles, publish the roster.
    ///
    /// The count prefers the backend's `viewerCount` over the local list
    /// length. Fetch errors are logged and swallowed; previously displayed
    /// data stays.
    pub async fn sync_viewers(&self, stream_id: &StreamId, token: &CancellationToken) {
        let record = match self.api.get_stream(stream_id).await {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(stream_id = %stream_id, error = %err, "viewer poll tick failed");
                return;
            }
        };

        let refs = dedup_viewer_refs(&record.viewers);
        let ids: Vec<UserId> = refs.iter().map(|(id, _)| id.clone()).collect();
        let profiles = self.profiles.resolve_many(&ids).await;

        // Stale tick from a cancelled poller: drop the results.
        if token.is_cancelled() {
            return;
        }

        let viewers: Vec<Viewer> = profiles
            .into_iter()
            .zip(refs)
            .map(|(profile, (_, location))| Viewer::from_profile(profile, location))
            .collect();
        let count = record
            .viewer_count
            .unwrap_or_else(|| u32::try_from(viewers.len()).unwrap_or(u32::MAX));
        self.roster.replace(viewers, count);
    }

    /// Comment tick: fetch the full list and replace the feed wholesale.
    pub async fn sync_comments(&self, stream_id: &StreamId, token: &CancellationToken) {
        let records = match self.api.get_comments(stream_id).await {
            Ok(records) => records,
            Err(err) => {
                tracing::debug!(stream_id = %stream_id, error = %err, "comment poll tick failed");
                return;
            }
        };

        if token.is_cancelled() {
            return;
        }

        let comments: Vec<Comment> = records
            .into_iter()
            .map(CommentRecord::into_comment)
            .collect();
        self.comments.replace_all(comments);
    }

    #[must_use]
    pub fn roster(&self) -> Arc<ViewerRoster> {
        Arc::clone(&self.roster)
    }

    #[must_use]
    pub fn comment_feed(&self) -> Arc<CommentFeed> {
        Arc::clone(&self.comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolive_core::cache::ProfileSource;
    use geolive_core::models::UserRecord;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NamedSource;

    #[async_trait::async_trait]
    impl ProfileSource for NamedSource {
        async fn fetch_profile(&self, user_id: &UserId) -> geolive_core::Result<UserRecord> {
            Ok(UserRecord {
                display_name: Some(format!("name-{user_id}")),
                ..UserRecord::default()
            })
        }
    }

    fn sync_for(server_uri: &str) -> LiveSync {
        let api = ApiClient::from_base_url(&format!("{server_uri}/")).expect("client");
        let profiles = ProfileCache::new(Arc::new(NamedSource), 64);
        LiveSync::new(
            api,
            profiles,
            Arc::new(ViewerRoster::new()),
            Arc::new(CommentFeed::new()),
        )
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let entries: Vec<ViewerEntry> = serde_json::from_str(
            r#"["u2", "u1", {"userId":"u2"}, {"uid":"u3"}, "u1"]"#,
        )
        .expect("parse");
        let refs = dedup_viewer_refs(&entries);
        let ids: Vec<String> = refs.into_iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec!["u2", "u1", "u3"]);
    }

    #[tokio::test]
    async fn test_viewer_tick_resolves_and_prefers_backend_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live-streams/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": { "id": "s1", "viewerCount": 9, "viewers": ["u1", "u2", "u1"] }
            })))
            .mount(&server)
            .await;

        let sync = sync_for(&server.uri());
        let token = CancellationToken::new();
        sync.sync_viewers(&StreamId::from_string("s1".to_string()), &token)
            .await;

        let (viewers, count) = sync.roster().snapshot();
        assert_eq!(count, 9);
        let names: Vec<&str> = viewers.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["name-u1", "name-u2"]);
    }

    #[tokio::test]
    async fn test_comment_tick_replaces_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live-streams/s1/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": [
                    { "id": "c3", "timestamp": 30, "text": "third" },
                    { "id": "c1", "timestamp": 10, "text": "first" },
                    { "id": "c2", "timestamp": 20, "text": "second" }
                ]
            })))
            .mount(&server)
            .await;

        let sync = sync_for(&server.uri());
        sync.comment_feed().append_local(Comment::local(
            UserId::from_string("me".to_string()),
            "Me".to_string(),
            String::new(),
            "optimistic".to_string(),
        ));

        let token = CancellationToken::new();
        sync.sync_comments(&StreamId::from_string("s1".to_string()), &token)
            .await;

        let stamps: Vec<i64> = sync
            .comment_feed()
            .snapshot()
            .iter()
            .map(|c| c.timestamp)
            .collect();
        assert_eq!(stamps, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_cancelled_tick_does_not_apply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live-streams/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": { "id": "s1", "viewerCount": 9, "viewers": ["u1"] }
            })))
            .mount(&server)
            .await;

        let sync = sync_for(&server.uri());
        let token = CancellationToken::new();
        token.cancel();
        sync.sync_viewers(&StreamId::from_string("s1".to_string()), &token)
            .await;
        assert_eq!(sync.roster().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_tick_keeps_previous_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live-streams/s1/comments"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sync = sync_for(&server.uri());
        sync.comment_feed()
            .replace_all(vec![Comment::local(
                UserId::from_string("u1".to_string()),
                "Alice".to_string(),
                String::new(),
                "kept".to_string(),
            )]);

        let token = CancellationToken::new();
        sync.sync_comments(&StreamId::from_string("s1".to_string()), &token)
            .await;
        assert_eq!(sync.comment_feed().len(), 1);
    }
}
