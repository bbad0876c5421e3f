//! Time source for the controller
//!
//! Timestamps are durations since the clock's origin, so tests can drive the
//! controller with exact values.

use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic time since the clock's origin
    fn now(&self) -> Duration;
}

/// Wall clock measured from when it was created
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
