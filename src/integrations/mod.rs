//! Device integrations used by commands and hooks

pub mod hue;
pub mod tuya;

pub use hue::{HttpBridge, LightBridge, LightState, LightUpdate};
pub use tuya::{InfraredRemote, TuyaCloud};

/// External services a command or hook may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    Hue,
    Tuya,
}

impl std::fmt::Display for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Integration::Hue => write!(f, "hue"),
            Integration::Tuya => write!(f, "tuya"),
        }
    }
}

#[cfg(test)]
pub(crate) mod fake;
