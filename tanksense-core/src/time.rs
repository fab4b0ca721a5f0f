//! Time access for the wire decoder
//!
//! The decoder busy-waits on pin transitions with microsecond-level
//! deadlines, so it needs a monotonic clock rather than wall time.
//! The [`Clock`] trait keeps that dependency injectable: targets plug
//! in a hardware timer, tests drive a [`FixedClock`] by hand.

use core::cell::Cell;

/// Monotonic microsecond clock consumed by the wire decoder.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin. Must never go
    /// backwards within the lifetime of one bus instance.
    fn now_micros(&self) -> u64;

    /// Milliseconds since the same origin.
    fn now_millis(&self) -> u64 {
        self.now_micros() / 1000
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_micros(&self) -> u64 {
        (**self).now_micros()
    }
}

/// Monotonic clock backed by `std::time::Instant` (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Creates a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// Manually advanced clock for testing
///
/// Interior mutability lets test harnesses advance time while the bus
/// holds the clock.
#[derive(Debug, Default)]
pub struct FixedClock {
    micros: Cell<u64>,
}

impl FixedClock {
    /// Creates a clock reading `micros`.
    pub fn new(micros: u64) -> Self {
        Self {
            micros: Cell::new(micros),
        }
    }

    /// Sets the absolute time.
    pub fn set(&self, micros: u64) {
        self.micros.set(micros);
    }

    /// Moves time forward by `micros`.
    pub fn advance_micros(&self, micros: u64) {
        self.micros.set(self.micros.get() + micros);
    }

    /// Moves time forward by `millis`.
    pub fn advance_millis(&self, millis: u64) {
        self.advance_micros(millis * 1000);
    }
}

impl Clock for FixedClock {
    fn now_micros(&self) -> u64 {
        self.micros.get()
    }
}
