//! Tuya infrared commands

use std::rc::Rc;

use anyhow::Context;
use tracing::info;

use crate::integrations::InfraredRemote;

use super::Command;

/// Press one key on an infrared air conditioner remote
pub struct TuyaPressKeyInfraredAc {
    device: String,
    key: String,
    remote: Rc<dyn InfraredRemote>,
}

impl TuyaPressKeyInfraredAc {
    pub fn new(device: String, key: String, remote: Rc<dyn InfraredRemote>) -> Self {
        Self { device, key, remote }
    }
}

impl Command for TuyaPressKeyInfraredAc {
    fn name(&self) -> &str {
        "tuya_press_key_infrared_ac"
    }

    fn execute(&self) -> anyhow::Result<()> {
        info!(device = %self.device, key = %self.key, "pressing infrared key");

        self.remote
            .press_key(&self.device, &self.key)
            .with_context(|| format!("failed to press {} on {}", self.key, self.device))
    }
}
