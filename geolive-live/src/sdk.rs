//! Seam for the external streaming SDK.

use async_trait::async_trait;
use geolive_core::models::{RoomId, UserId};
use geolive_core::Result;

/// The transport-level streaming SDK (room setup, broadcast, teardown).
///
/// The real implementation wraps a native SDK outside this crate; the
/// controller only ever sees this trait, injected at construction, so the
/// state machine is testable in isolation.
///
/// Every call is asynchronous and independently fallible. `stop_broadcast`
/// and `disconnect` are teardown-path calls: callers log their failures and
/// keep going.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamingSdk: Send + Sync {
    /// Connect to `room_id` as `user_id`. Hosts pass `is_host = true` and
    /// must follow up with [`start_broadcast`](Self::start_broadcast).
    async fn initialize(
        &self,
        user_id: &UserId,
        room_id: &RoomId,
        user_name: &str,
        is_host: bool,
    ) -> Result<()>;

    async fn start_broadcast(&self) -> Result<()>;

    async fn stop_broadcast(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}
