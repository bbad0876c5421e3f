//! Frame input
//!
//! Landmark frames come from an external hand tracker as one JSON object per
//! line, e.g. `{"t": 12.5, "landmarks": [{"x": 0.5, "y": 0.4}, ...]}`. A
//! missing or null `landmarks` field means no hand was found. The optional
//! `t` is the capture time in seconds on the tracker's clock; recorded
//! sessions replay on their own timeline when it is present.

mod listener;

use std::time::Duration;

use serde::Deserialize;

use crate::gesture::Landmark;

pub use listener::{FrameEvent, FrameListener};

/// Raw data for one tick
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub t: Option<f64>,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
}

impl Frame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_landmarks(landmarks: Vec<Landmark>) -> Self {
        Self {
            t: None,
            landmarks: Some(landmarks),
        }
    }

    /// Capture time, when present and usable as a `Duration`
    pub fn timestamp(&self) -> Option<Duration> {
        self.t.and_then(|t| Duration::try_from_secs_f64(t).ok())
    }

    pub fn has_hand(&self) -> bool {
        self.landmarks.as_ref().is_some_and(|lm| !lm.is_empty())
    }
}
