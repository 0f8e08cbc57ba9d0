use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared view of a network's "learning" flag.
///
/// Cloning is cheap; every clone observes the same flag. Calling `stop()`
/// from any thread ends the active run at its next row boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    learning: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        StopHandle::default()
    }

    /// Clears the learning flag.
    pub fn stop(&self) {
        self.learning.store(false, Ordering::Relaxed);
    }

    pub fn is_learning(&self) -> bool {
        self.learning.load(Ordering::Relaxed)
    }

    /// Sets the flag; returns `false` if it was already set.
    pub(crate) fn engage(&self) -> bool {
        self.learning
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}
