//! Lifecycle guard: kills live sessions when the app leaves the foreground
//! or the screen goes away, so no "ghost" broadcast outlives its UI.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::controller::SessionController;

/// OS-level application lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    Foreground,
    Background,
    Inactive,
}

impl AppPhase {
    #[must_use]
    pub const fn is_foreground(self) -> bool {
        matches!(self, Self::Foreground)
    }
}

/// What the UI should do with a hardware back press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    /// Not live: let navigation proceed.
    Allow,
    /// Live: show the end-session confirmation prompt first.
    ConfirmEnd,
}

/// Watches app phase transitions and back navigation on behalf of a
/// controller.
///
/// Leaving the foreground while live terminates silently (the app is not
/// interactively visible, so no prompt and no error surface). Back presses
/// while live get a confirmation prompt instead. Double-termination races
/// with the explicit end action collapse inside the controller.
pub struct LifecycleGuard {
    controller: Arc<SessionController>,
    watch_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for LifecycleGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleGuard")
            .field("watching", &self.watch_task.lock().is_some())
            .finish()
    }
}

impl LifecycleGuard {
    #[must_use]
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self {
            controller,
            watch_task: Mutex::new(None),
        }
    }

    /// Start observing phase transitions. Replaces any previous watch.
    pub fn watch(&self, mut phases: watch::Receiver<AppPhase>) {
        let controller = Arc::clone(&self.controller);
        let task = tokio::spawn(async move {
            let mut last = *phases.borrow();
            while phases.changed().await.is_ok() {
                let phase = *phases.borrow_and_update();
                if last.is_foreground() && !phase.is_foreground() && controller.is_live() {
                    tracing::info!("app left foreground while live; terminating session");
                    controller.terminate_silently().await;
                }
                last = phase;
            }
        });
        if let Some(previous) = self.watch_task.lock().replace(task) {
            previous.abort();
        }
    }

    #[must_use]
    pub fn on_back_pressed(&self) -> BackAction {
        if self.controller.is_live() {
            BackAction::ConfirmEnd
        } else {
            BackAction::Allow
        }
    }

    /// The user accepted the back-press confirmation prompt.
    pub async fn confirm_end(&self) {
        self.controller.end().await;
    }

    /// Screen unmount: stop watching and run the silent-termination safety
    /// net regardless of what caused the unmount.
    pub async fn dispose(&self) {
        if let Some(task) = self.watch_task.lock().take() {
            task.abort();
        }
        self.controller.terminate_silently().await;
    }
}
