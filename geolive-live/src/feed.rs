//! Local view state for a live session: the comment feed and the viewer
//! roster.
//!
//! Both are owned by the controller and shared with pollers via `Arc`.
//! Single-writer semantics: poll ticks and controller actions are the only
//! mutators; the UI reads snapshots.

use parking_lot::RwLock;

use geolive_core::models::{Comment, Viewer};

/// Ordered comment list with optimistic-append and wholesale-replace
/// semantics.
#[derive(Debug, Default)]
pub struct CommentFeed {
    comments: RwLock<Vec<Comment>>,
}

impl CommentFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a locally-originated comment before backend confirmation.
    /// The next authoritative replacement supersedes it.
    pub fn append_local(&self, comment: Comment) {
        self.comments.write().push(comment);
    }

    /// Replace the whole list with the backend ordering, ascending by
    /// timestamp. No incremental merge: optimistic entries that the backend
    /// does not echo back disappear here.
    pub fn replace_all(&self, mut comments: Vec<Comment>) {
        comments.sort_by_key(|c| c.timestamp);
        *self.comments.write() = comments;
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Comment> {
        self.comments.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.read().is_empty()
    }
}

#[derive(Debug, Default)]
struct RosterState {
    viewers: Vec<Viewer>,
    count: u32,
}

/// Resolved viewer list plus the session's viewer count.
///
/// The count is tracked separately from the list because the backend may
/// report viewers that no longer resolve to profiles.
#[derive(Debug, Default)]
pub struct ViewerRoster {
    state: RwLock<RosterState>,
}

impl ViewerRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, viewers: Vec<Viewer>, count: u32) {
        let mut state = self.state.write();
        state.viewers = viewers;
        state.count = count;
    }

    /// Update only the count, e.g. seeded from a join/leave response before
    /// the first viewer poll lands.
    pub fn set_count(&self, count: u32) {
        self.state.write().count = count;
    }

    #[must_use]
    pub fn snapshot(&self) -> (Vec<Viewer>, u32) {
        let state = self.state.read();
        (state.viewers.clone(), state.count)
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.state.read().count
    }
}
