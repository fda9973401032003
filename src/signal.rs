use parking_lot::{Condvar, Mutex};

/// A manual-reset condition: once set it stays set until an explicit
/// `reset`, releasing every current and future waiter in between.
///
/// The latch is sticky rather than counting, which is what makes
/// signal-before-wait safe: a waiter that arrives after the signal returns
/// immediately, and a single broadcast releases all waiters. Waking does
/// not consume the signal.
#[derive(Debug, Default)]
pub struct Signal {
    signaled: Mutex<bool>,
    condition: Condvar,
}

impl Signal {
    /// Create a signal in the unset state
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condition: Condvar::new(),
        }
    }

    /// Set the signal and wake all waiters, present and future
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.condition.notify_all();
    }

    /// Clear the signal. Wakes no one.
    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    /// Block until the signal is set. Returns immediately if it already is.
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        // Loop guards against spurious wakeups.
        while !*signaled {
            self.condition.wait(&mut signaled);
        }
    }

    /// Observe the current state without blocking
    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }
}
