//! Tick counting and deadline-style timers.
//!
//! The external runtime advances the simulation in discrete, fixed-size
//! ticks. Durations are always converted to an absolute expiry tick at
//! creation time; a timer is then a pure function of the current tick,
//! which keeps resimulation safe (re-running a tick re-evaluates the
//! same deadlines and gets the same answers).

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Ticks per second for the simulation.
///
/// A shooter needs a higher rate than an RTS; 60 matches the cadence of
/// the networking middleware this core is built against.
pub const TICK_RATE: u32 = 60;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// Duration of one tick in seconds, as fixed-point.
#[must_use]
pub fn tick_delta() -> Fixed {
    Fixed::from_num(1) / Fixed::from_num(TICK_RATE)
}

/// Convert a duration in seconds to a whole number of ticks, rounding up.
///
/// Negative durations clamp to zero ticks.
#[must_use]
pub fn ticks_from_seconds(seconds: Fixed) -> u64 {
    if seconds <= Fixed::ZERO {
        return 0;
    }
    let scaled = seconds * Fixed::from_num(TICK_RATE);
    scaled.ceil().to_num::<u64>()
}

/// Deadline-style timer: a duration captured as an absolute expiry tick.
///
/// Mirrors the middleware timer primitive ("create timer for N seconds
/// from now" / "has this timer expired as of tick T"). An unset timer is
/// inert: it never reports expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TickTimer {
    expires_at: Option<u64>,
}

impl TickTimer {
    /// The inert timer. Never expires.
    pub const NONE: Self = Self { expires_at: None };

    /// Create a timer that expires `seconds` from tick `now`.
    #[must_use]
    pub fn from_seconds(now: u64, seconds: Fixed) -> Self {
        Self {
            expires_at: Some(now + ticks_from_seconds(seconds)),
        }
    }

    /// Create a timer that expires `ticks` from tick `now`.
    #[must_use]
    pub const fn from_ticks(now: u64, ticks: u64) -> Self {
        Self {
            expires_at: Some(now + ticks),
        }
    }

    /// Whether the timer is set.
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.expires_at.is_some()
    }

    /// Whether the timer has expired as of tick `now`.
    ///
    /// An unset timer reports `false`.
    #[must_use]
    pub fn expired(self, now: u64) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }

    /// The absolute expiry tick, if set.
    #[must_use]
    pub const fn expires_at(self) -> Option<u64> {
        self.expires_at
    }

    /// Ticks remaining until expiry as of tick `now` (zero once expired).
    #[must_use]
    pub fn remaining_ticks(self, now: u64) -> Option<u64> {
        self.expires_at.map(|at| at.saturating_sub(now))
    }
}
