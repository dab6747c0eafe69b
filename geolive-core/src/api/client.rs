//! HTTP client for the live-streaming backend.

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::ApiConfig;
use crate::models::{StreamId, UserId, UserRecord};
use crate::{Error, Result};

use super::types::{
    ApiEnvelope, CommentRecord, CreateStreamRequest, JoinStreamRequest, NewCommentRequest,
    StreamRecord,
};

/// Client for the backend REST API.
///
/// Every response is a `{ success, data?, error? }` envelope; envelope
/// failures surface as [`Error::Api`] with the structured code when the
/// backend sends one.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct StreamListBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    streams: Option<Vec<StreamRecord>>,
    #[serde(default)]
    data: Option<Vec<StreamRecord>>,
}

#[derive(Debug, Deserialize)]
struct UserLookupBody {
    #[serde(default)]
    data: Option<UserRecord>,
    #[serde(default)]
    user: Option<UserRecord>,
    #[serde(flatten)]
    inline: UserRecord,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            base_url: Url::parse(&config.base_url)?,
        })
    }

    /// Build a client against an explicit base URL with default timeouts.
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Send a request and unwrap the envelope; `data` is required.
    async fn request<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.request_opt(builder).await?.ok_or_else(|| Error::Api {
            code: None,
            message: "response envelope missing data".to_string(),
        })
    }

    /// Send a request and unwrap the envelope; `data` may be absent.
    async fn request_opt<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>> {
        let envelope: ApiEnvelope<T> = builder.send().await?.json().await?;
        if envelope.success {
            Ok(envelope.data)
        } else {
            let (code, message) = match envelope.error {
                Some(body) => (body.code(), body.message()),
                None => (None, "request failed".to_string()),
            };
            Err(Error::Api { code, message })
        }
    }

    /// `POST /live-streams`
    pub async fn create_stream(&self, request: &CreateStreamRequest) -> Result<StreamRecord> {
        let url = self.endpoint("live-streams")?;
        self.request(self.http.post(url).json(request)).await
    }

    /// `PATCH /live-streams/{id}/end`
    pub async fn end_stream(&self, stream_id: &StreamId, user_id: &UserId) -> Result<()> {
        let url = self.endpoint(&format!("live-streams/{stream_id}/end"))?;
        let body = serde_json::json!({ "userId": user_id });
        self.request_opt::<StreamRecord>(self.http.patch(url).json(&body))
            .await?;
        Ok(())
    }

    /// `POST /live-streams/{id}/join`
    ///
    /// A failed join is not fatal for watching: fall back to reading the
    /// stream record so the caller still gets room/viewer-count data.
    pub async fn join_stream(
        &self,
        stream_id: &StreamId,
        request: &JoinStreamRequest,
    ) -> Result<StreamRecord> {
        let url = self.endpoint(&format!("live-streams/{stream_id}/join"))?;
        match self.request(self.http.post(url).json(request)).await {
            Ok(record) => Ok(record),
            Err(err) => {
                tracing::debug!(stream_id = %stream_id, error = %err, "join failed, reading stream record instead");
                self.get_stream(stream_id).await
            }
        }
    }

    /// `POST /live-streams/{id}/leave`
    pub async fn leave_stream(
        &self,
        stream_id: &StreamId,
        user_id: &UserId,
    ) -> Result<Option<StreamRecord>> {
        let url = self.endpoint(&format!("live-streams/{stream_id}/leave"))?;
        let body = serde_json::json!({ "userId": user_id });
        self.request_opt(self.http.post(url).json(&body)).await
    }

    /// `GET /live-streams/{id}`
    pub async fn get_stream(&self, stream_id: &StreamId) -> Result<StreamRecord> {
        let url = self.endpoint(&format!("live-streams/{stream_id}"))?;
        self.request(self.http.get(url)).await
    }

    /// `GET /live-streams` — currently active streams.
    ///
    /// The list arrives under `streams` or `data` depending on backend
    /// version.
    pub async fn list_active_streams(&self) -> Result<Vec<StreamRecord>> {
        let url = self.endpoint("live-streams")?;
        let body: StreamListBody = self.http.get(url).send().await?.json().await?;
        if !body.success && body.streams.is_none() && body.data.is_none() {
            return Err(Error::Api {
                code: None,
                message: "stream list request failed".to_string(),
            });
        }
        Ok(body.streams.or(body.data).unwrap_or_default())
    }

    /// `GET /live-streams/{id}/comments`
    pub async fn get_comments(&self, stream_id: &StreamId) -> Result<Vec<CommentRecord>> {
        let url = self.endpoint(&format!("live-streams/{stream_id}/comments"))?;
        Ok(self
            .request_opt(self.http.get(url))
            .await?
            .unwrap_or_default())
    }

    /// `POST /live-streams/{id}/comments`
    pub async fn post_comment(
        &self,
        stream_id: &StreamId,
        request: &NewCommentRequest,
    ) -> Result<()> {
        let url = self.endpoint(&format!("live-streams/{stream_id}/comments"))?;
        self.request_opt::<CommentRecord>(self.http.post(url).json(request))
            .await?;
        Ok(())
    }

    /// `GET /users/{id}` — profile lookup.
    ///
    /// The record arrives under `data`, `user`, or inline at the top level.
    pub async fn get_user(&self, user_id: &UserId) -> Result<UserRecord> {
        let url = self.endpoint(&format!("users/{user_id}"))?;
        let body: UserLookupBody = self.http.get(url).send().await?.json().await?;
        Ok(body.data.or(body.user).unwrap_or(body.inline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorCode;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> ApiClient {
        ApiClient::from_base_url(&format!("{}/", server.uri())).expect("client")
    }

    #[tokio::test]
    async fn test_create_stream_captures_backend_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/live-streams"))
            .and(body_partial_json(
                serde_json::json!({ "userId": "u1", "title": "Sunset Jam" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "success": true, "data": { "_id": "s1", "roomId": "room_1" } }),
            ))
            .mount(&server)
            .await;

        let api = client(&server).await;
        let request = CreateStreamRequest::new(
            UserId::from_string("u1".to_string()),
            "Sunset Jam".to_string(),
            crate::models::RoomId::from_string("room_1".to_string()),
            "Alice".to_string(),
            String::new(),
            None,
        );
        let record = api.create_stream(&request).await.expect("create");
        assert_eq!(record.stream_id().map(|id| id.0), Some("s1".to_string()));
    }

    #[tokio::test]
    async fn test_end_stream_surfaces_structured_code() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/live-streams/s1/end"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": { "code": "OWNER_MISMATCH", "message": "not the owner" }
            })))
            .mount(&server)
            .await;

        let api = client(&server).await;
        let err = api
            .end_stream(
                &StreamId::from_string("s1".to_string()),
                &UserId::from_string("u1".to_string()),
            )
            .await
            .expect_err("should fail");
        match &err {
            Error::Api { code, .. } => assert_eq!(code, &Some(ApiErrorCode::OwnerMismatch)),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_owner_mismatch());
    }

    #[tokio::test]
    async fn test_join_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/live-streams/s1/join"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "success": false, "error": "join disabled" }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/live-streams/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "success": true, "data": { "id": "s1", "viewerCount": 7 } }),
            ))
            .mount(&server)
            .await;

        let api = client(&server).await;
        let record = api
            .join_stream(
                &StreamId::from_string("s1".to_string()),
                &JoinStreamRequest {
                    user_id: UserId::from_string("u2".to_string()),
                    user_name: None,
                    user_avatar: None,
                },
            )
            .await
            .expect("join fallback");
        assert_eq!(record.viewer_count, Some(7));
    }

    #[tokio::test]
    async fn test_list_accepts_streams_or_data_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live-streams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "success": true, "streams": [ { "id": "s1", "userId": "u1" } ] }),
            ))
            .mount(&server)
            .await;

        let api = client(&server).await;
        let streams = api.list_active_streams().await.expect("list");
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_get_user_tolerates_payload_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "user": { "displayName": "Alice" } }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/u2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "username": "bob99" })),
            )
            .mount(&server)
            .await;

        let api = client(&server).await;
        let record = api
            .get_user(&UserId::from_string("u1".to_string()))
            .await
            .expect("lookup");
        assert_eq!(record.display_name.as_deref(), Some("Alice"));

        let record = api
            .get_user(&UserId::from_string("u2".to_string()))
            .await
            .expect("lookup");
        assert_eq!(record.username.as_deref(), Some("bob99"));
    }
}
