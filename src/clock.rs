//! Monotonic timestamps for frame timing.
//!
//! A [`Timestamp`] is an offset from the clock's own origin; subtracting two
//! of them yields elapsed seconds as `f64`.

use std::cell::Cell;
use std::ops::Sub;
use std::time::{Duration, Instant};

/// Point in time relative to a clock origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// Round to the nearest nanosecond; negative input clamps to zero
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(secs_to_duration(secs))
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl Sub for Timestamp {
    type Output = f64;

    /// Elapsed seconds from `rhs` to `self`; negative if `rhs` is later.
    fn sub(self, rhs: Timestamp) -> f64 {
        if self.0 >= rhs.0 {
            (self.0 - rhs.0).as_secs_f64()
        } else {
            -((rhs.0 - self.0).as_secs_f64())
        }
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::from_nanos((secs.max(0.0) * 1e9).round() as u64)
}

/// Source of monotonic timestamps
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }
}

/// Clock that only moves when told to.
///
/// Used when replaying recorded traces and in tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    current: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time in seconds
    pub fn set_secs(&self, secs: f64) {
        self.current.set(Timestamp::from_secs_f64(secs).0);
    }

    /// Move forward by `secs` seconds
    pub fn advance_secs(&self, secs: f64) {
        self.current.set(self.current.get() + secs_to_duration(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.current.get())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
