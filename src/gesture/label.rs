//! Gesture labels produced by the classifier

use serde::Deserialize;

/// Label for the wake gesture
pub const WAKE: &str = "closed_fist";

/// Label emitted when no upright hand is visible
pub const NO_HAND: &str = "no_hand";

/// Prefix of composite finger labels, e.g. `fingers_extended:index+middle`
pub const FINGERS_PREFIX: &str = "fingers_extended:";

/// Separator between finger names in a composite label
pub const FINGER_SEPARATOR: &str = "+";

/// One classified frame. Compared by value only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct GestureLabel(String);

impl GestureLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn wake() -> Self {
        Self::new(WAKE)
    }

    pub fn no_hand() -> Self {
        Self::new(NO_HAND)
    }

    /// Build a composite label from finger names already in canonical order
    pub fn fingers<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = names
            .into_iter()
            .map(|n| n.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(FINGER_SEPARATOR);
        Self(format!("{FINGERS_PREFIX}{joined}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GestureLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// True iff `label` is the wake token. Absent labels never wake.
pub fn is_wake(label: Option<&GestureLabel>) -> bool {
    label.is_some_and(|l| l.as_str() == WAKE)
}
