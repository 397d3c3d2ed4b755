//! Per-connection task tracking.
//!
//! Every stream spawned for a connection runs as a tracked tokio task, so
//! teardown can signal all of them at once and nothing outlives the
//! connection unobserved. Cancellation is cooperative: [`ConnectionTasks::cancel_all`]
//! fires the connection token and returns immediately; runners notice at
//! their next suspension point.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// The set of in-flight tasks owned by one connection.
pub struct ConnectionTasks {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl ConnectionTasks {
    /// Create an empty task set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn `future` as a tracked task.
    ///
    /// Completion untracks it automatically, whatever the outcome and even
    /// while teardown is in progress.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    /// The connection-scoped cancellation token.
    ///
    /// Stream registry entries are parented to it so a connection-wide
    /// cancel reaches every runner.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Signal cancellation to every tracked task and stop accepting new
    /// ones. Returns immediately; termination is cooperative.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
        self.tracker.close();
    }

    /// Number of tasks still running.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Whether no tasks are running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait for every tracked task to finish. Call after [`Self::cancel_all`].
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }
}

impl Default for ConnectionTasks {
    fn default() -> Self {
        Self::new()
    }
}
