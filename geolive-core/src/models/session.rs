use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RoomId, StreamId, UserId};

/// Live session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No session in progress
    Idle,
    /// SDK room setup (and broadcast start, for hosts) in flight
    Initializing,
    /// Broadcasting or watching
    Live,
    /// Teardown in progress
    Ending,
    /// Teardown finished
    Ended,
}

impl SessionState {
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended)
    }

    /// Valid transitions of the session state machine.
    ///
    /// `Initializing → Idle` is the defined fallback for a failed SDK call.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Initializing)
                | (Self::Initializing, Self::Live)
                | (Self::Initializing, Self::Idle)
                | (Self::Live, Self::Ending)
                | (Self::Ending, Self::Ended)
        )
    }
}

/// One broadcast/viewing session.
///
/// `stream_id` is backend-assigned and may lag behind `room_id`; while it is
/// unknown, termination falls back to resolving the owner's currently active
/// stream by `owner_id`.
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub stream_id: Option<StreamId>,
    pub room_id: Option<RoomId>,
    pub owner_id: Option<UserId>,
    pub title: Option<String>,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
}

impl LiveSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stream_id: None,
            room_id: None,
            owner_id: None,
            title: None,
            state: SessionState::Idle,
            started_at: None,
        }
    }

    /// Enter `Initializing` for a fresh session owned by `owner`.
    pub fn begin(&mut self, owner: UserId, title: Option<String>) {
        self.stream_id = None;
        self.room_id = None;
        self.owner_id = Some(owner);
        self.title = title;
        self.state = SessionState::Initializing;
        self.started_at = None;
    }

    /// Mark the session live, recording the start time.
    pub fn go_live(&mut self) {
        self.state = SessionState::Live;
        self.started_at = Some(Utc::now());
    }

    pub fn begin_ending(&mut self) {
        self.state = SessionState::Ending;
    }

    pub fn finish(&mut self) {
        self.state = SessionState::Ended;
        self.stream_id = None;
        self.owner_id = None;
    }

    /// Fall back to `Idle` after a failed initialization.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.state.is_live()
    }
}

impl Default for LiveSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_matrix() {
        use SessionState::{Ended, Ending, Idle, Initializing, Live};

        assert!(Idle.can_transition_to(Initializing));
        assert!(Initializing.can_transition_to(Live));
        assert!(Initializing.can_transition_to(Idle));
        assert!(Live.can_transition_to(Ending));
        assert!(Ending.can_transition_to(Ended));

        assert!(!Idle.can_transition_to(Live));
        assert!(!Live.can_transition_to(Idle));
        assert!(!Ended.can_transition_to(Live));
        assert!(!Ending.can_transition_to(Live));
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = LiveSession::new();
        assert_eq!(session.state, SessionState::Idle);

        let owner = UserId::from_string("host1".to_string());
        session.begin(owner.clone(), Some("Sunset Jam".to_string()));
        assert_eq!(session.state, SessionState::Initializing);
        assert_eq!(session.owner_id, Some(owner));
        assert!(session.started_at.is_none());

        session.go_live();
        assert!(session.is_live());
        assert!(session.started_at.is_some());

        session.begin_ending();
        session.finish();
        assert_eq!(session.state, SessionState::Ended);
        assert!(session.stream_id.is_none());
        assert!(session.owner_id.is_none());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut session = LiveSession::new();
        session.begin(UserId::new(), None);
        session.reset();
        assert_eq!(session.state, SessionState::Idle);
        assert!(session.owner_id.is_none());
    }
}
