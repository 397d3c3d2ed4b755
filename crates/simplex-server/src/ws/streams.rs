//! Per-stream cancellation registry.
//!
//! One entry per in-flight stream, keyed by the caller-supplied stream id.
//! The entry is shared between the runner that created it and the receive
//! loop handling `cancel_stream` frames, and lives until the runner removes
//! it. Stream id uniqueness is a caller contract: starting a second stream
//! under a live id replaces the first entry, leaving the earlier stream's
//! token unreachable from `cancel`.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Registry of cancellation entries for in-flight streams.
#[derive(Default)]
pub struct StreamRegistry {
    entries: Mutex<HashMap<String, CancellationToken>>,
}

impl StreamRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh entry for `id` and return its token.
    ///
    /// The entry is a child of `parent`, so a connection-wide cancel
    /// reaches the stream through the same token as a targeted cancel.
    pub fn start(&self, id: &str, parent: &CancellationToken) -> CancellationToken {
        let token = parent.child_token();
        let _ = self.entries.lock().insert(id.to_string(), token.clone());
        token
    }

    /// Mark `id` cancelled. Unknown or already-ended ids are tolerated.
    pub fn cancel(&self, id: &str) {
        if let Some(token) = self.entries.lock().get(id) {
            token.cancel();
        }
    }

    /// Whether `id` has been cancelled. Unknown ids read as not cancelled.
    #[must_use]
    pub fn is_cancelled(&self, id: &str) -> bool {
        self.entries
            .lock()
            .get(id)
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Remove the entry for `id`. Idempotent.
    pub fn end(&self, id: &str) {
        let _ = self.entries.lock().remove(id);
    }

    /// Number of in-flight entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no streams are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
