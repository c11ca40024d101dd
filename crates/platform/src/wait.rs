//! Busy-wait polling on hardware-observable conditions.
//!
//! The loader has no scheduler and no timebase it can trust before the PLL
//! locks, so every wait is a tight poll. Production code uses [`Spin`],
//! which never gives up: a flag that never asserts is a hardware fault and
//! hanging is the fault model. [`Bounded`] puts an upper limit on the
//! number of polls so tests (and bench diagnostics) can observe a hang as
//! an error instead of wedging the test runner.
//!
//! # Usage
//!
//! ```
//! use platform::wait::{Bounded, WaitPolicy};
//!
//! let mut polls = 0;
//! let mut wait = Bounded::new(10);
//! wait.wait_until(|| {
//!     polls += 1;
//!     polls == 3
//! })
//! .unwrap();
//! assert_eq!(polls, 3);
//! ```

use thiserror::Error;

/// A bounded wait gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("condition not met after {polls} polls")]
pub struct WaitTimeout {
    /// Number of polls that observed the condition false.
    pub polls: u32,
}

/// Strategy for waiting on a condition.
pub trait WaitPolicy {
    /// Poll `ready` until it returns `true`.
    ///
    /// Returns only after `ready` has returned `true` at least once, or with
    /// `Err` if the policy gives up.
    fn wait_until<F>(&mut self, ready: F) -> Result<(), WaitTimeout>
    where
        F: FnMut() -> bool;
}

/// Unbounded spin: never returns `Err`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spin;

impl WaitPolicy for Spin {
    fn wait_until<F>(&mut self, mut ready: F) -> Result<(), WaitTimeout>
    where
        F: FnMut() -> bool,
    {
        while !ready() {
            core::hint::spin_loop();
        }
        Ok(())
    }
}

/// Spin at most `limit` times, then report [`WaitTimeout`].
#[derive(Debug, Clone, Copy)]
pub struct Bounded {
    limit: u32,
    total_polls: u32,
}

impl Bounded {
    /// Give up after `limit` polls that observed `false`.
    pub const fn new(limit: u32) -> Self {
        Self {
            limit,
            total_polls: 0,
        }
    }

    /// Polls performed across every wait made through this policy.
    pub const fn total_polls(&self) -> u32 {
        self.total_polls
    }
}

impl WaitPolicy for Bounded {
    fn wait_until<F>(&mut self, mut ready: F) -> Result<(), WaitTimeout>
    where
        F: FnMut() -> bool,
    {
        let mut misses: u32 = 0;
        loop {
            self.total_polls = self.total_polls.saturating_add(1);
            if ready() {
                return Ok(());
            }
            misses = misses.saturating_add(1);
            if misses >= self.limit {
                return Err(WaitTimeout { polls: misses });
            }
            core::hint::spin_loop();
        }
    }
}

impl<W: WaitPolicy + ?Sized> WaitPolicy for &mut W {
    fn wait_until<F>(&mut self, ready: F) -> Result<(), WaitTimeout>
    where
        F: FnMut() -> bool,
    {
        (**self).wait_until(ready)
    }
}
