//! # Timelocked Parameters
//!
//! Every governance-controlled value in a vault (fee rates, treasuries, the
//! valuation adapter reference, the fee-charge throttle) is wrapped in a
//! [`TimelockedParameter`]. A new value is first *staged*, and only after the
//! governance delay has elapsed can it be *committed* into the active slot.
//!
//! ```text
//!            stage(v)                  commit() [now >= ready_at]
//!  active ─────────────► active + staged ───────────────────────► active = v
//!                              │
//!                              └── rollback() ──► active (unchanged)
//! ```
//!
//! The active value is never written directly. Re-staging replaces the
//! pending value and restarts the delay; there is no queue.
//!
//! Authorization is not this module's job. The owner of the parameter
//! (see the governance layer) decides who may call `stage`/`commit`/`rollback`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Timestamp;

/// Failures of the stage/commit cycle.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TimelockError {
    /// The governance delay has not elapsed yet.
    #[error("too early: staged value becomes committable at {ready_at}, now is {now}")]
    TooEarly {
        /// Earliest commit time.
        ready_at: Timestamp,
        /// Time of the rejected attempt.
        now: Timestamp,
    },

    /// `commit` was called with nothing staged.
    #[error("nothing staged")]
    NothingStaged,
}

/// A value that can only change after a mandatory delay.
///
/// Invariant: `staged.is_some() == (staged_ready_at != 0)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockedParameter<T> {
    active: T,
    staged: Option<T>,
    staged_ready_at: Timestamp,
}

impl<T> TimelockedParameter<T> {
    /// Creates a parameter with `initial` active and nothing staged.
    pub fn new(initial: T) -> Self {
        Self {
            active: initial,
            staged: None,
            staged_ready_at: 0,
        }
    }

    /// The value currently in force.
    pub fn active(&self) -> &T {
        &self.active
    }

    /// The pending value, if any.
    pub fn staged(&self) -> Option<&T> {
        self.staged.as_ref()
    }

    /// Earliest commit time of the pending value, `0` when nothing is staged.
    pub fn staged_ready_at(&self) -> Timestamp {
        self.staged_ready_at
    }

    /// Whether a value is waiting to be committed.
    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// Stages `value`, replacing any pending one, and returns its ready time.
    ///
    /// The ready time is clamped to at least 1 so that a zero delay at
    /// timestamp zero still satisfies the staged/ready invariant.
    pub fn stage(&mut self, value: T, now: Timestamp, delay: u64) -> Timestamp {
        let ready_at = now.saturating_add(delay).max(1);
        self.staged = Some(value);
        self.staged_ready_at = ready_at;
        ready_at
    }

    /// Promotes the staged value to active.
    ///
    /// # Errors
    ///
    /// [`TimelockError::NothingStaged`] when nothing is pending,
    /// [`TimelockError::TooEarly`] when `now < staged_ready_at`.
    pub fn commit(&mut self, now: Timestamp) -> Result<&T, TimelockError> {
        if self.staged.is_none() {
            return Err(TimelockError::NothingStaged);
        }
        if now < self.staged_ready_at {
            return Err(TimelockError::TooEarly {
                ready_at: self.staged_ready_at,
                now,
            });
        }
        if let Some(value) = self.staged.take() {
            self.active = value;
        }
        self.staged_ready_at = 0;
        Ok(&self.active)
    }

    /// Drops the pending value, regardless of elapsed time. Returns it.
    pub fn rollback(&mut self) -> Option<T> {
        self.staged_ready_at = 0;
        self.staged.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: u64 = 86_400;

    #[test]
    fn new_parameter_has_nothing_staged() {
        let p = TimelockedParameter::new(7u64);
        assert_eq!(*p.active(), 7);
        assert!(!p.is_staged());
        assert_eq!(p.staged_ready_at(), 0);
    }

    #[test]
    fn commit_one_second_early_is_too_early() {
        let mut p = TimelockedParameter::new(1u64);
        let ready_at = p.stage(2, 1_000, DELAY);
        assert_eq!(ready_at, 1_000 + DELAY);

        assert_eq!(
            p.commit(ready_at - 1),
            Err(TimelockError::TooEarly {
                ready_at,
                now: ready_at - 1
            })
        );
        assert_eq!(*p.active(), 1);

        assert_eq!(p.commit(ready_at).copied(), Ok(2));
        assert!(!p.is_staged());
        assert_eq!(p.staged_ready_at(), 0);
    }

    #[test]
    fn commit_without_stage_fails() {
        let mut p = TimelockedParameter::new("a".to_string());
        assert_eq!(p.commit(u64::MAX), Err(TimelockError::NothingStaged));
    }

    #[test]
    fn restage_restarts_the_delay() {
        let mut p = TimelockedParameter::new(0u32);
        p.stage(1, 100, DELAY);
        let second = p.stage(2, 5_000, DELAY);
        assert_eq!(second, 5_000 + DELAY);
        assert!(p.commit(100 + DELAY).is_err());
        assert_eq!(p.commit(second).copied(), Ok(2));
    }

    #[test]
    fn rollback_ignores_delay_and_keeps_active() {
        let mut p = TimelockedParameter::new(10u32);
        p.stage(20, 0, DELAY);
        assert_eq!(p.rollback(), Some(20));
        assert_eq!(*p.active(), 10);
        assert!(!p.is_staged());
        assert_eq!(p.staged_ready_at(), 0);
        assert_eq!(p.rollback(), None);
    }

    #[test]
    fn zero_delay_at_time_zero_keeps_invariant() {
        let mut p = TimelockedParameter::new(0u8);
        let ready_at = p.stage(1, 0, 0);
        assert_ne!(ready_at, 0);
        assert!(p.is_staged());
    }
}
