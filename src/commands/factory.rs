//! Typed command factory
//!
//! Gesture bindings come from the configuration file. Command names form a
//! closed set, so a misspelled name fails when the file is parsed rather
//! than when the gesture is first held.

use std::rc::Rc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::events::EventBus;
use crate::gesture::GestureLabel;
use crate::integrations::{InfraredRemote, Integration, LightBridge, LightUpdate};

use super::{Command, CommandRegistry, HueTurnOffLights, HueTurnOnLights, TuyaPressKeyInfraredAc};

/// Shared dependencies handed to commands and hooks at construction
#[derive(Clone)]
pub struct Services {
    pub bus: Rc<EventBus>,
    /// Present only when the Hue integration is enabled
    pub hue: Option<Rc<dyn LightBridge>>,
    /// Present only when the Tuya integration is enabled
    pub tuya: Option<Rc<dyn InfraredRemote>>,
}

impl Services {
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            bus,
            hue: None,
            tuya: None,
        }
    }

    pub fn with_hue(mut self, bridge: Rc<dyn LightBridge>) -> Self {
        self.hue = Some(bridge);
        self
    }

    pub fn with_tuya(mut self, remote: Rc<dyn InfraredRemote>) -> Self {
        self.tuya = Some(remote);
        self
    }

    /// Whether the integration was enabled and its client built
    pub fn has(&self, integration: Integration) -> bool {
        match integration {
            Integration::Hue => self.hue.is_some(),
            Integration::Tuya => self.tuya.is_some(),
        }
    }

    pub fn hue(&self) -> Result<Rc<dyn LightBridge>, BuildError> {
        self.hue
            .clone()
            .ok_or(BuildError::IntegrationUnavailable(Integration::Hue))
    }

    pub fn tuya(&self) -> Result<Rc<dyn InfraredRemote>, BuildError> {
        self.tuya
            .clone()
            .ok_or(BuildError::IntegrationUnavailable(Integration::Tuya))
    }
}

/// Errors building commands or hooks from configuration
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("integration {0} is not enabled")]
    IntegrationUnavailable(Integration),
}

/// Commands that can be bound to a gesture
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandSpec {
    HueTurnOnLights {
        light_ids: Vec<u32>,
        #[serde(default)]
        color: Option<LightUpdate>,
    },
    HueTurnOffLights {
        light_ids: Vec<u32>,
    },
    TuyaPressKeyInfraredAc {
        /// Name of a `[tuya.devices]` entry
        device: String,
        key: String,
    },
}

impl CommandSpec {
    /// Integration the command needs at run time
    pub fn integration(&self) -> Option<Integration> {
        match self {
            CommandSpec::HueTurnOnLights { .. } | CommandSpec::HueTurnOffLights { .. } => {
                Some(Integration::Hue)
            }
            CommandSpec::TuyaPressKeyInfraredAc { .. } => Some(Integration::Tuya),
        }
    }

    pub fn build(&self, services: &Services) -> Result<Rc<dyn Command>, BuildError> {
        let command: Rc<dyn Command> = match self {
            CommandSpec::HueTurnOnLights { light_ids, color } => Rc::new(HueTurnOnLights::new(
                light_ids.clone(),
                color.clone(),
                services.hue()?,
                Rc::clone(&services.bus),
            )),
            CommandSpec::HueTurnOffLights { light_ids } => Rc::new(HueTurnOffLights::new(
                light_ids.clone(),
                services.hue()?,
                Rc::clone(&services.bus),
            )),
            CommandSpec::TuyaPressKeyInfraredAc { device, key } => Rc::new(
                TuyaPressKeyInfraredAc::new(device.clone(), key.clone(), services.tuya()?),
            ),
        };
        Ok(command)
    }
}

/// One `[[gestures]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GestureBinding {
    pub label: GestureLabel,
    #[serde(flatten)]
    pub command: CommandSpec,
}

impl CommandRegistry {
    /// Build a registry from configured bindings
    ///
    /// Bindings whose integration is disabled are skipped with a warning,
    /// which leaves their label to the fallback command.
    pub fn from_bindings(bindings: &[GestureBinding], services: &Services) -> Self {
        let mut registry = Self::new();

        for binding in bindings {
            if let Some(integration) = binding.command.integration() {
                if !services.has(integration) {
                    warn!(label = %binding.label, %integration, "integration disabled, skipping gesture binding");
                    continue;
                }
            }
            match binding.command.build(services) {
                Ok(command) => registry.register(binding.label.clone(), command),
                Err(e) => {
                    warn!(label = %binding.label, error = %e, "skipping gesture binding");
                }
            }
        }

        info!(bound = registry.len(), configured = bindings.len(), "command registry built");
        registry
    }
}
