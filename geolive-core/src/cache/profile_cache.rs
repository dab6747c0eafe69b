//! Viewer profile resolution cache.
//!
//! Memoizes user id → `{name, avatar}` so viewer polling does not hit the
//! backend for the same profile on every tick. Entries live for the whole
//! process; stale-but-available beats re-fetching during a live session.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{ResolvedProfile, UserId, UserRecord};
use crate::{Error, Result};

/// Where raw profile payloads come from. Production uses [`ApiClient`];
/// tests substitute a mock.
///
/// [`ApiClient`]: crate::api::ApiClient
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, user_id: &UserId) -> Result<UserRecord>;
}

#[async_trait]
impl ProfileSource for crate::api::ApiClient {
    async fn fetch_profile(&self, user_id: &UserId) -> Result<UserRecord> {
        self.get_user(user_id).await
    }
}

/// In-memory id → profile cache with no TTL.
///
/// Concurrent misses for the same id coalesce into one backend lookup.
/// Lookup failures resolve to a placeholder and are NOT cached, so a later
/// tick may retry; polling is never interrupted by one unresolved profile.
#[derive(Clone)]
pub struct ProfileCache {
    source: Arc<dyn ProfileSource>,
    entries: moka::future::Cache<UserId, ResolvedProfile>,
}

impl std::fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl ProfileCache {
    #[must_use]
    pub fn new(source: Arc<dyn ProfileSource>, max_capacity: u64) -> Self {
        Self {
            source,
            entries: moka::future::Cache::new(max_capacity),
        }
    }

    /// Resolve a user id to a display profile, hitting the backend at most
    /// once per id (per successful lookup).
    pub async fn resolve(&self, user_id: &UserId) -> ResolvedProfile {
        let source = Arc::clone(&self.source);
        let id = user_id.clone();
        let result = self
            .entries
            .try_get_with(user_id.clone(), async move {
                let record = source.fetch_profile(&id).await?;
                Ok::<_, Error>(ResolvedProfile::from_record(id, &record))
            })
            .await;

        match result {
            Ok(profile) => profile,
            Err(err) => {
                tracing::debug!(user_id = %user_id, error = %err, "profile lookup failed, using placeholder");
                ResolvedProfile::placeholder(user_id.clone())
            }
        }
    }

    /// Resolve a batch of ids, preserving input order.
    pub async fn resolve_many(&self, user_ids: &[UserId]) -> Vec<ResolvedProfile> {
        let mut profiles = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            profiles.push(self.resolve(user_id).await);
        }
        profiles
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn uid(id: &str) -> UserId {
        UserId::from_string(id.to_string())
    }

    fn record(name: &str) -> UserRecord {
        UserRecord {
            display_name: Some(name.to_string()),
            ..UserRecord::default()
        }
    }

    #[tokio::test]
    async fn test_second_resolve_is_a_cache_hit() {
        let mut source = MockProfileSource::new();
        source
            .expect_fetch_profile()
            .with(eq(uid("u1")))
            .times(1)
            .returning(|_| Ok(record("Alice")));

        let cache = ProfileCache::new(Arc::new(source), 128);
        let first = cache.resolve(&uid("u1")).await;
        let second = cache.resolve(&uid("u1")).await;
        assert_eq!(first.name, "Alice");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failure_returns_placeholder_without_caching_it() {
        let mut source = MockProfileSource::new();
        let mut calls = 0;
        source.expect_fetch_profile().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(Error::Api {
                    code: None,
                    message: "backend down".to_string(),
                })
            } else {
                Ok(record("Alice"))
            }
        });

        let cache = ProfileCache::new(Arc::new(source), 128);
        let degraded = cache.resolve(&uid("u1")).await;
        assert_eq!(degraded.name, "Viewer");
        assert_eq!(degraded.avatar, "");

        // Failure was not cached; the retry succeeds and sticks.
        let resolved = cache.resolve(&uid("u1")).await;
        assert_eq!(resolved.name, "Alice");
    }

    #[tokio::test]
    async fn test_resolve_many_preserves_order() {
        let mut source = MockProfileSource::new();
        source
            .expect_fetch_profile()
            .returning(|id| Ok(record(&format!("name-{id}"))));

        let cache = ProfileCache::new(Arc::new(source), 128);
        let profiles = cache
            .resolve_many(&[uid("b"), uid("a"), uid("c")])
            .await;
        let names: Vec<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name-b", "name-a", "name-c"]);
    }
}
