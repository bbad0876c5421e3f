//! In-memory device clients for tests

use std::cell::RefCell;
use std::collections::HashMap;

use super::hue::{BridgeError, LightBridge, LightState, LightUpdate};
use super::tuya::{InfraredRemote, TuyaError};

/// Serves states from a map and records every `set_light` call
#[derive(Default)]
pub(crate) struct FakeBridge {
    pub states: RefCell<HashMap<u32, LightState>>,
    pub calls: RefCell<Vec<(u32, LightUpdate)>>,
    pub fail_light: Option<u32>,
}

impl FakeBridge {
    pub fn with_states(states: impl IntoIterator<Item = (u32, LightState)>) -> Self {
        Self {
            states: RefCell::new(states.into_iter().collect()),
            ..Self::default()
        }
    }
}

impl LightBridge for FakeBridge {
    fn light_state(&self, light: u32) -> Result<LightState, BridgeError> {
        Ok(self.states.borrow().get(&light).cloned().unwrap_or_default())
    }

    fn set_light(&self, light: u32, update: &LightUpdate) -> Result<(), BridgeError> {
        if self.fail_light == Some(light) {
            return Err(BridgeError::Api {
                light,
                description: "device is not reachable".to_string(),
            });
        }
        self.calls.borrow_mut().push((light, update.clone()));
        Ok(())
    }
}

/// Records key presses for the devices it knows about
#[derive(Default)]
pub(crate) struct FakeRemote {
    pub devices: Vec<String>,
    pub presses: RefCell<Vec<(String, String)>>,
}

impl FakeRemote {
    pub fn with_devices(devices: &[&str]) -> Self {
        Self {
            devices: devices.iter().map(|d| d.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl InfraredRemote for FakeRemote {
    fn press_key(&self, device: &str, key: &str) -> Result<(), TuyaError> {
        if !self.devices.iter().any(|d| d == device) {
            return Err(TuyaError::UnknownDevice(device.to_string()));
        }
        self.presses
            .borrow_mut()
            .push((device.to_string(), key.to_string()));
        Ok(())
    }
}
