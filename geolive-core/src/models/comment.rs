use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Current wall-clock time as epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A chat message tied to a live session.
///
/// Created optimistically client-side on send (with a locally assigned id);
/// the next comment poll replaces the whole list with the backend's
/// authoritative ordering, so local and backend ids may diverge until then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub user_id: UserId,
    pub user_name: String,
    pub user_avatar: String,
    pub text: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl Comment {
    /// Build an optimistic local comment, stamped with the current time.
    #[must_use]
    pub fn local(user_id: UserId, user_name: String, user_avatar: String, text: String) -> Self {
        let ts = now_ms();
        Self {
            id: ts.to_string(),
            user_id,
            user_name,
            user_avatar,
            text,
            timestamp: ts,
        }
    }
}
