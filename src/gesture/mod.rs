//! Gesture classification
//!
//! Turns raw hand landmarks into opaque labels. The controller only compares
//! labels for equality and asks whether one is the wake gesture.

mod label;
pub mod landmarks;
mod recognizer;

pub use label::{is_wake, GestureLabel};
pub use landmarks::Landmark;
pub use recognizer::classify;
