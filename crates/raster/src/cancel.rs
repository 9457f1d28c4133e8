//! Cooperative cancellation for in-flight rasterization.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared cancellation flag for one load operation.
///
/// The rasterizer checks the token before each page render and aborts
/// with `RasterizeError::Cancelled` once it observes the flag. Clones
/// share the same underlying state, so the UI thread keeps one clone and
/// hands the other to the worker.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag the operation as cancelled. Idempotent; visible to all clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
