//! Cancelable fixed-interval poller.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A repeating task standing in for push updates.
///
/// The first tick fires immediately, then every `interval`. Each tick gets a
/// clone of the cancellation token: a tick whose fetch outlives
/// [`cancel`](Self::cancel) must check it before applying results, so
/// in-flight work from a cancelled poller never mutates shared state.
///
/// `cancel` is idempotent and safe from any cleanup path; dropping the
/// poller cancels it too.
pub struct Poller {
    token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl Poller {
    pub fn spawn<F, Fut>(interval: Duration, tick: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    _ = timer.tick() => {
                        tick(task_token.clone()).await;
                    }
                }
            }
        });

        Self {
            token,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
        if let Some(handle) = self.handle.lock().take() {
            // The loop exits at the next select; a tick already past its
            // cancellation check finishes its (ignored) work on its own.
            drop(handle);
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_fire_on_interval() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let poller = Poller::spawn(Duration::from_secs(5), move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // First tick is immediate.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);

        poller.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let poller = Poller::spawn(Duration::from_secs(5), |_| async {});
        poller.cancel();
        poller.cancel();
        assert!(poller.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_sees_cancellation() {
        let applied = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&applied);
        let poller = Poller::spawn(Duration::from_secs(5), move |token| {
            let counter = Arc::clone(&counter);
            async move {
                // Simulate an in-flight fetch that outlives cancellation.
                tokio::time::sleep(Duration::from_secs(1)).await;
                if !token.is_cancelled() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        poller.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(applied.load(Ordering::SeqCst), 0);
    }
}
