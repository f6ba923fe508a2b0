//! Process-wide shutdown signal (§5, "Running flag").
//!
//! A thin `Arc<AtomicBool>` newtype so `main`'s driver loop and any producer
//! thread share one shutdown signal without re-deriving the pattern ad hoc.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    pub fn new() -> Self {
        RunningFlag(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Flip to false. Any scheduler waiting on `wait_next` must wake promptly;
    /// the scheduler's own periodic re-evaluation handles that without needing
    /// a dedicated notify call here.
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}
