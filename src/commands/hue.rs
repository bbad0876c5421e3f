//! Hue light commands
//!
//! Both commands report the lights they touched with
//! [`Event::LightsChanged`] so hooks can avoid undoing the change.

use std::rc::Rc;

use anyhow::Context;
use tracing::info;

use crate::events::{Event, EventBus};
use crate::integrations::{LightBridge, LightUpdate};

use super::Command;

/// Turn lights on, optionally applying a colour afterwards
pub struct HueTurnOnLights {
    light_ids: Vec<u32>,
    color: Option<LightUpdate>,
    bridge: Rc<dyn LightBridge>,
    bus: Rc<EventBus>,
}

impl HueTurnOnLights {
    pub fn new(
        light_ids: Vec<u32>,
        color: Option<LightUpdate>,
        bridge: Rc<dyn LightBridge>,
        bus: Rc<EventBus>,
    ) -> Self {
        Self {
            light_ids,
            color,
            bridge,
            bus,
        }
    }
}

impl Command for HueTurnOnLights {
    fn name(&self) -> &str {
        "hue_turn_on_lights"
    }

    fn execute(&self) -> anyhow::Result<()> {
        info!(lights = ?self.light_ids, "turning lights on");

        for &light in &self.light_ids {
            self.bridge
                .set_light(light, &LightUpdate::on())
                .with_context(|| format!("failed to turn on light {light}"))?;
        }

        if let Some(color) = &self.color {
            for &light in &self.light_ids {
                self.bridge
                    .set_light(light, color)
                    .with_context(|| format!("failed to colour light {light}"))?;
            }
        }

        self.bus.publish(&Event::LightsChanged {
            light_ids: self.light_ids.clone(),
        })?;
        Ok(())
    }
}

/// Turn lights off
pub struct HueTurnOffLights {
    light_ids: Vec<u32>,
    bridge: Rc<dyn LightBridge>,
    bus: Rc<EventBus>,
}

impl HueTurnOffLights {
    pub fn new(light_ids: Vec<u32>, bridge: Rc<dyn LightBridge>, bus: Rc<EventBus>) -> Self {
        Self {
            light_ids,
            bridge,
            bus,
        }
    }
}

impl Command for HueTurnOffLights {
    fn name(&self) -> &str {
        "hue_turn_off_lights"
    }

    fn execute(&self) -> anyhow::Result<()> {
        info!(lights = ?self.light_ids, "turning lights off");

        for &light in &self.light_ids {
            self.bridge
                .set_light(light, &LightUpdate::off())
                .with_context(|| format!("failed to turn off light {light}"))?;
        }

        self.bus.publish(&Event::LightsChanged {
            light_ids: self.light_ids.clone(),
        })?;
        Ok(())
    }
}
