//! Time sources.
//!
//! The engine reads the clock once per operation and hands the value to the
//! state machine. Deadlines are compared against that value only.

use autocrowd_core::Timestamp;
use parking_lot::Mutex;

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current UTC time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to `t`.
    pub fn set(&self, t: Timestamp) {
        *self.now.lock() = t;
    }

    /// Move forward by `secs` and return the new time. Saturates at the
    /// last representable instant.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let mut now = self.now.lock();
        if let Some(next) = now.checked_add_secs(secs) {
            *now = next;
        }
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
