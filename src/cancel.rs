//! Cooperative cancellation for scan and analysis sessions.
//!
//! A [`CancelToken`] is a shared flag. Long-running loops check it between
//! units of work (one file while scanning, one record while analyzing) and
//! stop early once it is set. Opening a new directory cancels the previous
//! session's token so stale work cannot race with the new catalog.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
