//! Trailing-debounce primitive.
//!
//! Brush drags fire continuously; only the last gesture within a quiet
//! window should commit a filter mutation. Each `call` cancels any still
//! pending action and schedules the new one after the window elapses, so
//! the last event wins. Canceling (or dropping the debouncer) aborts the
//! pending task, so nothing fires after the owning view is torn down.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Default quiet window for brush commits.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Timer-based last-event-wins coalescer.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Schedule `action` to run once the input stream has been idle for
    /// the window, replacing any action scheduled earlier.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            action.await;
        }));
    }

    /// Abort any pending action without running it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
