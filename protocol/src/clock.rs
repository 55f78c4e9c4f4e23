//! Time sources.
//!
//! Vault logic never reads the wall clock directly. It asks a [`Clock`],
//! which production code backs with [`SystemClock`] and tests back with a
//! [`ManualClock`] they can advance one second at a time.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// UNIX timestamp in seconds.
pub type Timestamp = u64;

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// Current UNIX time in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time via `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-1970 clocks are not a scenario we entertain.
        Utc::now().timestamp().max(0) as Timestamp
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jumps to an absolute time.
    pub fn set(&self, timestamp: Timestamp) {
        self.now.store(timestamp, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
