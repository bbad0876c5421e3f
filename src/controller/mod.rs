//! Mode controller
//!
//! Turns a stream of per-frame gesture labels into timed actions: arming on a
//! held wake gesture, firing a command on a held command gesture, and
//! settling after success, failure or timeout.

mod clock;
mod mode;

use std::time::Duration;

pub use clock::{Clock, MonotonicClock};
pub use mode::ModeController;

/// Hold and timeout thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// How long the wake gesture must be held to arm
    pub wake_hold: Duration,
    /// How long a command gesture must be held to fire
    pub hold: Duration,
    /// How long armed mode lasts without a command
    pub armed_timeout: Duration,
    /// Cool-down after a command before tracking resumes
    pub debounce: Duration,
}
