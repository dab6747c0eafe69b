//! Session lifecycle controller.
//!
//! Owns the `Idle → Initializing → Live → Ending → Ended` state machine and
//! mediates between the UI shell, the streaming SDK, and the backend.
//!
//! Termination runs at most once per session: the check of the re-entrancy
//! flag and the `Live → Ending` transition happen under the session mutex
//! with no suspension point in between, so a racing explicit end and guard
//! signal collapse to one teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use geolive_core::api::{ApiClient, CreateStreamRequest, JoinStreamRequest, NewCommentRequest};
use geolive_core::cache::ProfileCache;
use geolive_core::config::PollingConfig;
use geolive_core::models::{Comment, GeoPoint, LiveSession, RoomId, SessionState, StreamId, UserId};
use geolive_core::{Error, Result};

use crate::feed::{CommentFeed, ViewerRoster};
use crate::identity::IdentityResolver;
use crate::poller::Poller;
use crate::sdk::StreamingSdk;
use crate::sync::LiveSync;

/// Navigation parameters for the viewer "join" flow. At least one of the
/// two ids must be present.
#[derive(Debug, Clone, Default)]
pub struct JoinParams {
    pub stream_id: Option<StreamId>,
    pub room_id: Option<RoomId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionRole {
    Host,
    Viewer,
}

/// Controller for one broadcast/viewing session.
///
/// One instance per screen; the session object and its derived view state
/// are owned exclusively by this instance.
pub struct SessionController {
    api: ApiClient,
    sdk: Arc<dyn StreamingSdk>,
    identity: Arc<IdentityResolver>,
    sync: Arc<LiveSync>,
    polling: PollingConfig,
    session: Mutex<LiveSession>,
    role: Mutex<SessionRole>,
    ending: AtomicBool,
    viewer_poll: Mutex<Option<Poller>>,
    comment_poll: Mutex<Option<Poller>>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .finish()
    }
}

impl SessionController {
    #[must_use]
    pub fn new(
        api: ApiClient,
        sdk: Arc<dyn StreamingSdk>,
        identity: Arc<IdentityResolver>,
        profiles: ProfileCache,
        polling: PollingConfig,
    ) -> Self {
        let sync = Arc::new(LiveSync::new(
            api.clone(),
            profiles,
            Arc::new(ViewerRoster::new()),
            Arc::new(CommentFeed::new()),
        ));
        Self {
            api,
            sdk,
            identity,
            sync,
            polling,
            session: Mutex::new(LiveSession::new()),
            role: Mutex::new(SessionRole::Viewer),
            ending: AtomicBool::new(false),
            viewer_poll: Mutex::new(None),
            comment_poll: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.lock().state
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.session.lock().is_live()
    }

    #[must_use]
    pub fn session_snapshot(&self) -> LiveSession {
        self.session.lock().clone()
    }

    #[must_use]
    pub fn comments(&self) -> Arc<CommentFeed> {
        self.sync.comment_feed()
    }

    #[must_use]
    pub fn viewers(&self) -> Arc<ViewerRoster> {
        self.sync.roster()
    }

    /// Host "start": broadcast via the SDK, then register the stream with
    /// the backend.
    ///
    /// SDK failures abort the action and return the session to `Idle`. A
    /// backend create failure after the broadcast is already up is degraded
    /// but non-fatal: the session stays `Live` with no `stream_id`, and
    /// termination later resolves the stream by owner id.
    pub async fn start(&self, title: &str, location: Option<GeoPoint>) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("stream title is required".to_string()));
        }
        let owner = self.identity.resolve_user_id().await?;
        let room = RoomId::generate_for(&owner);

        {
            let mut session = self.session.lock();
            if session.state != SessionState::Idle {
                return Err(Error::InvalidInput(
                    "a session is already in progress".to_string(),
                ));
            }
            self.ending.store(false, Ordering::SeqCst);
            session.begin(owner.clone(), Some(title.to_string()));
            session.room_id = Some(room.clone());
            *self.role.lock() = SessionRole::Host;
        }

        let display_name = self.identity.display_name();
        if let Err(err) = self.sdk.initialize(&owner, &room, &display_name, true).await {
            self.session.lock().reset();
            return Err(err);
        }
        if let Err(err) = self.sdk.start_broadcast().await {
            if let Err(cleanup) = self.sdk.disconnect().await {
                tracing::debug!(error = %cleanup, "disconnect after failed broadcast start");
            }
            self.session.lock().reset();
            return Err(err);
        }

        self.session.lock().go_live();
        tracing::info!(room_id = %room, owner_id = %owner, "broadcast started");

        let request = CreateStreamRequest::new(
            owner.clone(),
            title.to_string(),
            room,
            display_name,
            self.identity.avatar(),
            location,
        );
        match self.api.create_stream(&request).await {
            Ok(record) => {
                self.capture_stream_and_arm(record.stream_id());
            }
            Err(err) => {
                tracing::warn!(error = %err, "backend stream create failed; broadcasting without backend tracking");
            }
        }

        Ok(())
    }

    /// Viewer "join": resolve the room, connect through the SDK, then
    /// best-effort register with the backend and arm polling.
    pub async fn join(&self, params: JoinParams) -> Result<()> {
        let user = self.identity.resolve_user_id().await?;

        let stream_id = params.stream_id;
        let room = match params.room_id.filter(|room| !room.is_empty()) {
            Some(room) => room,
            None => {
                let known = stream_id.clone().ok_or(Error::RoomUnresolved)?;
                self.resolve_room_id(&known).await?
            }
        };

        {
            let mut session = self.session.lock();
            if session.state != SessionState::Idle {
                return Err(Error::InvalidInput(
                    "a session is already in progress".to_string(),
                ));
            }
            self.ending.store(false, Ordering::SeqCst);
            session.begin(user.clone(), None);
            session.room_id = Some(room.clone());
            session.stream_id = stream_id.clone();
            *self.role.lock() = SessionRole::Viewer;
        }

        let display_name = self.identity.display_name();
        if let Err(err) = self
            .sdk
            .initialize(&user, &room, &display_name, false)
            .await
        {
            self.session.lock().reset();
            return Err(err);
        }

        self.session.lock().go_live();
        tracing::info!(room_id = %room, user_id = %user, "joined broadcast");

        if let Some(stream_id) = stream_id {
            let request = JoinStreamRequest {
                user_id: user,
                user_name: Some(display_name),
                user_avatar: Some(self.identity.avatar()),
            };
            let seeded_count = match self.api.join_stream(&stream_id, &request).await {
                Ok(record) => record.viewer_count,
                Err(err) => {
                    tracing::debug!(stream_id = %stream_id, error = %err, "backend join failed");
                    None
                }
            };
            if self.capture_stream_and_arm(Some(stream_id)) {
                if let Some(count) = seeded_count {
                    self.sync.roster().set_count(count);
                }
            }
        }

        Ok(())
    }

    /// Host "end" action.
    pub async fn end(&self) {
        self.terminate().await;
    }

    /// Viewer "leave" action.
    pub async fn leave(&self) {
        self.terminate().await;
    }

    /// Silent termination for lifecycle-guard paths (backgrounding, screen
    /// unmount). Identical teardown, no user-facing surface.
    pub async fn terminate_silently(&self) {
        self.terminate().await;
    }

    /// The termination contract, in strict order: SDK teardown, poller
    /// cancellation, best-effort backend notify. Runs at most once per
    /// session; teardown failures are logged, never re-thrown.
    async fn terminate(&self) {
        let (stream_id, owner, role) = {
            let mut session = self.session.lock();
            if !session.state.is_live() {
                return;
            }
            // Check-and-set with no await between: racing end/guard calls
            // collapse here.
            if self.ending.swap(true, Ordering::SeqCst) {
                return;
            }
            session.begin_ending();
            (
                session.stream_id.clone(),
                session.owner_id.clone(),
                *self.role.lock(),
            )
        };

        if role == SessionRole::Host {
            if let Err(err) = self.sdk.stop_broadcast().await {
                tracing::debug!(error = %err, "stop_broadcast failed during teardown");
            }
        }
        if let Err(err) = self.sdk.disconnect().await {
            tracing::debug!(error = %err, "disconnect failed during teardown");
        }

        self.cancel_pollers();

        if let Some(owner) = owner {
            self.notify_backend_ended(stream_id, &owner, role).await;
        }

        self.session.lock().finish();
        tracing::info!("session ended");
    }

    /// Optimistic comment send: append locally first, then best-effort post
    /// to the backend. The next comment poll replaces the feed with the
    /// authoritative list.
    pub async fn send_comment(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("comment text is required".to_string()));
        }
        let stream_id = {
            let session = self.session.lock();
            if !session.is_live() {
                return Err(Error::InvalidInput("no live session".to_string()));
            }
            session.stream_id.clone()
        };

        let user = self.identity.resolve_user_id().await?;
        let name = self.identity.display_name();
        let avatar = self.identity.avatar();

        self.sync.comment_feed().append_local(Comment::local(
            user.clone(),
            name.clone(),
            avatar.clone(),
            text.to_string(),
        ));

        if let Some(stream_id) = stream_id {
            let request = NewCommentRequest {
                user_id: user,
                text: text.to_string(),
                user_name: Some(name),
                user_avatar: Some(avatar),
            };
            if let Err(err) = self.api.post_comment(&stream_id, &request).await {
                tracing::debug!(stream_id = %stream_id, error = %err, "comment post failed; next poll reconciles");
            }
        }

        Ok(())
    }

    /// Resolve a stream's room id by probing the session-detail endpoint,
    /// bounded by one viewer-poll window.
    async fn resolve_room_id(&self, stream_id: &StreamId) -> Result<RoomId> {
        let probe = self.polling.room_resolve_probe_interval();
        let window = self.polling.viewer_interval();
        let attempts = (window.as_secs() / probe.as_secs().max(1)).max(1);

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(probe).await;
            }
            match self.api.get_stream(stream_id).await {
                Ok(record) => {
                    if let Some(room) = record.resolved_room_id() {
                        return Ok(room);
                    }
                }
                Err(err) => {
                    tracing::debug!(stream_id = %stream_id, error = %err, "room resolve probe failed");
                }
            }
        }
        Err(Error::RoomUnresolved)
    }

    /// Best-effort backend notify at teardown. With no known `stream_id`,
    /// hosts fall back to resolving their currently active stream by owner
    /// id. An ownership-mismatch rejection is retried exactly once with the
    /// auth-provider identity.
    async fn notify_backend_ended(
        &self,
        stream_id: Option<StreamId>,
        owner: &UserId,
        role: SessionRole,
    ) {
        let stream_id = match stream_id {
            Some(id) => Some(id),
            None if role == SessionRole::Host => self.resolve_own_active_stream(owner).await,
            None => None,
        };
        let Some(stream_id) = stream_id else {
            tracing::debug!(owner_id = %owner, "no stream id known at teardown; skipping backend notify");
            return;
        };

        match role {
            SessionRole::Host => {
                if let Err(err) = self.api.end_stream(&stream_id, owner).await {
                    if err.is_owner_mismatch() {
                        self.retry_end_as_auth_user(&stream_id, owner).await;
                    } else {
                        tracing::debug!(stream_id = %stream_id, error = %err, "backend end notify failed");
                    }
                }
            }
            SessionRole::Viewer => {
                if let Err(err) = self.api.leave_stream(&stream_id, owner).await {
                    tracing::debug!(stream_id = %stream_id, error = %err, "backend leave notify failed");
                }
            }
        }
    }

    /// One retry for the transient race where the locally cached id and the
    /// provider-authenticated id diverge.
    async fn retry_end_as_auth_user(&self, stream_id: &StreamId, owner: &UserId) {
        let Some(auth_id) = self.identity.auth_user_id().filter(|id| id != owner) else {
            tracing::debug!(stream_id = %stream_id, "owner mismatch with no alternate identity");
            return;
        };
        tracing::debug!(stream_id = %stream_id, auth_id = %auth_id, "owner mismatch; retrying end as auth user");
        if let Err(err) = self.api.end_stream(stream_id, &auth_id).await {
            tracing::debug!(stream_id = %stream_id, error = %err, "end retry failed");
        }
    }

    /// Find the owner's currently active stream, for the window where the
    /// backend acknowledged creation but the id was never captured locally.
    async fn resolve_own_active_stream(&self, owner: &UserId) -> Option<StreamId> {
        match self.api.list_active_streams().await {
            Ok(streams) => streams
                .into_iter()
                .find(|record| record.user_id.as_deref() == Some(owner.as_str()))
                .and_then(|record| record.stream_id()),
            Err(err) => {
                tracing::debug!(error = %err, "active stream lookup failed");
                None
            }
        }
    }

    /// Record the backend stream id and arm polling, but only if the
    /// session is still live.
    ///
    /// The best-effort create/join calls run while the session is already
    /// `Live`, so termination can complete while they are in flight. The
    /// re-check happens under the session lock: a response landing after
    /// `Ending` is dropped here instead of spawning pollers nothing would
    /// ever cancel. Returns whether the id was captured.
    fn capture_stream_and_arm(&self, stream_id: Option<StreamId>) -> bool {
        let mut session = self.session.lock();
        if !session.state.is_live() || self.ending.load(Ordering::SeqCst) {
            tracing::debug!("session ended while backend registration was in flight; not arming pollers");
            return false;
        }
        session.stream_id = stream_id.clone();
        if let Some(stream_id) = stream_id {
            self.arm_pollers(&stream_id);
        }
        true
    }

    fn arm_pollers(&self, stream_id: &StreamId) {
        let sync = Arc::clone(&self.sync);
        let id = stream_id.clone();
        let viewer = Poller::spawn(self.polling.viewer_interval(), move |token| {
            let sync = Arc::clone(&sync);
            let id = id.clone();
            async move {
                sync.sync_viewers(&id, &token).await;
            }
        });
        *self.viewer_poll.lock() = Some(viewer);

        let sync = Arc::clone(&self.sync);
        let id = stream_id.clone();
        let comment = Poller::spawn(self.polling.comment_interval(), move |token| {
            let sync = Arc::clone(&sync);
            let id = id.clone();
            async move {
                sync.sync_comments(&id, &token).await;
            }
        });
        *self.comment_poll.lock() = Some(comment);
    }

    fn cancel_pollers(&self) {
        if let Some(poller) = self.viewer_poll.lock().take() {
            poller.cancel();
        }
        if let Some(poller) = self.comment_poll.lock().take() {
            poller.cancel();
        }
    }
}
