//! Single-flight provisioning lock

use std::sync::atomic::{AtomicBool, Ordering};

/// Binary gate admitting one deployment lifecycle at a time.
///
/// Acquiring never blocks: a caller that loses the race gets `false` and the
/// lock is left untouched.
#[derive(Debug, Default)]
pub struct SingleFlightLock {
    held: AtomicBool,
}

impl SingleFlightLock {
    /// Create a free lock
    pub fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Take the lock if it is free
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Free the lock. Releasing a free lock is a no-op.
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    /// Whether a lifecycle currently holds the lock
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}
