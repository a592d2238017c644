use crate::error::ReaderError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Long traversals poll the token once per this many newly visited nodes
pub const CANCELLATION_CHECK_INTERVAL: usize = 100;

/// Caller-driven cancellation flag shared between the caller and a
/// running query
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; queries stop at their next checkpoint
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint used inside traversals
    pub fn check(&self) -> Result<(), ReaderError> {
        if self.is_cancelled() {
            Err(ReaderError::Cancelled)
        } else {
            Ok(())
        }
    }
}
