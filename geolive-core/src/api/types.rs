//! Wire types for the backend REST API.
//!
//! All responses follow a `{ success, data?, error? }` envelope. Record
//! shapes are deliberately tolerant: ids arrive under `id` or `_id`, viewer
//! entries as bare id strings or objects, comment timestamps as `createdAt`
//! or epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiErrorCode;
use crate::models::{now_ms, Comment, GeoPoint, RoomId, StreamId, UserId};

/// Standard response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    // No `#[serde(default)]` here: that would put a `T: Default` bound on
    // the derived impl. A missing `Option` field is `None` anyway.
    pub data: Option<T>,
    pub error: Option<ApiErrorBody>,
}

const fn default_success() -> bool {
    true
}

/// Envelope error: either a bare message string (legacy backends) or a
/// structured `{ code, message }` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorBody {
    Text(String),
    Detail {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl ApiErrorBody {
    #[must_use]
    pub fn code(&self) -> Option<ApiErrorCode> {
        match self {
            Self::Text(_) => None,
            Self::Detail { code, .. } => code.as_deref().map(ApiErrorCode::parse),
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Text(message) => message.clone(),
            Self::Detail { message, .. } => message
                .clone()
                .unwrap_or_else(|| "request failed".to_string()),
        }
    }
}

/// A raw viewer entry in a stream record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ViewerEntry {
    Id(String),
    Detail {
        #[serde(default, rename = "userId")]
        user_id: Option<String>,
        #[serde(default)]
        uid: Option<String>,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        location: Option<GeoPoint>,
    },
}

impl ViewerEntry {
    /// The viewer's user id, if the entry carries one.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        let raw = match self {
            Self::Id(id) => Some(id.as_str()),
            Self::Detail {
                user_id, uid, id, ..
            } => user_id
                .as_deref()
                .or(uid.as_deref())
                .or(id.as_deref()),
        };
        raw.filter(|id| !id.is_empty())
            .map(|id| UserId::from_string(id.to_string()))
    }

    #[must_use]
    pub const fn location(&self) -> Option<GeoPoint> {
        match self {
            Self::Id(_) => None,
            Self::Detail { location, .. } => *location,
        }
    }
}

/// A live-stream record as the backend reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "_id")]
    pub mongo_id: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "roomId")]
    pub room_id: Option<String>,
    #[serde(default, rename = "channelName")]
    pub channel_name: Option<String>,
    #[serde(default, rename = "viewerCount")]
    pub viewer_count: Option<u32>,
    #[serde(default)]
    pub viewers: Vec<ViewerEntry>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, rename = "userName")]
    pub user_name: Option<String>,
    #[serde(default, rename = "userAvatar")]
    pub user_avatar: Option<String>,
}

impl StreamRecord {
    #[must_use]
    pub fn stream_id(&self) -> Option<StreamId> {
        self.id
            .as_deref()
            .or(self.mongo_id.as_deref())
            .filter(|id| !id.is_empty())
            .map(|id| StreamId::from_string(id.to_string()))
    }

    /// Room id under `roomId`, falling back to `channelName`.
    #[must_use]
    pub fn resolved_room_id(&self) -> Option<RoomId> {
        self.room_id
            .as_deref()
            .or(self.channel_name.as_deref())
            .filter(|id| !id.is_empty())
            .map(|id| RoomId::from_string(id.to_string()))
    }

    /// Broadcast location from the nested object or the flat pair.
    #[must_use]
    pub fn geo(&self) -> Option<GeoPoint> {
        self.location.or(match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        })
    }
}

/// A comment record as the backend reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "_id")]
    pub mongo_id: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    #[serde(default, rename = "userName")]
    pub user_name: Option<String>,
    #[serde(default, rename = "userAvatar")]
    pub user_avatar: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    /// Epoch milliseconds, for backends that send a numeric stamp instead.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl CommentRecord {
    /// Map into the local [`Comment`] shape.
    #[must_use]
    pub fn into_comment(self) -> Comment {
        let timestamp = self
            .created_at
            .map(|t| t.timestamp_millis())
            .or(self.timestamp)
            .unwrap_or_else(now_ms);
        let id = self
            .id
            .or(self.mongo_id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| timestamp.to_string());

        Comment {
            id,
            user_id: UserId::from_string(self.user_id.unwrap_or_default()),
            user_name: self.user_name.unwrap_or_else(|| "Anonymous".to_string()),
            user_avatar: self.user_avatar.unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            timestamp,
        }
    }
}

/// Body for `POST /live-streams`.
///
/// The backend historically accepted both a nested `location` object and
/// flat `latitude`/`longitude` fields; both are sent when known.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamRequest {
    pub user_id: UserId,
    pub title: String,
    pub room_id: RoomId,
    pub channel_name: RoomId,
    pub user_name: String,
    pub user_avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl CreateStreamRequest {
    #[must_use]
    pub fn new(
        user_id: UserId,
        title: String,
        room_id: RoomId,
        user_name: String,
        user_avatar: String,
        location: Option<GeoPoint>,
    ) -> Self {
        Self {
            user_id,
            title,
            channel_name: room_id.clone(),
            room_id,
            user_name,
            user_avatar,
            location,
            latitude: location.map(|l| l.latitude),
            longitude: location.map(|l| l.longitude),
        }
    }
}

/// Body for `POST /live-streams/{id}/join`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinStreamRequest {
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
}

/// Body for `POST /live-streams/{id}/comments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentRequest {
    pub user_id: UserId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
}
