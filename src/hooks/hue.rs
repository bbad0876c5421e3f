//! Hue light feedback for the armed episode
//!
//! On entering armed mode the hook snapshots its lights and fades them to the
//! armed colour. When the episode settles it restores the snapshot, skipping
//! any light a command changed in the meantime. Leaving armed mode itself does
//! nothing: the restore waits for the settle event so it runs after the
//! command.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use anyhow::Context;
use tracing::{debug, info};

use crate::commands::{BuildError, Services};
use crate::events::{Event, EventKind, Listener};
use crate::integrations::{LightBridge, LightState, LightUpdate};

use super::Hook;

/// Fade back over one second
const RESTORE_TRANSITION: u16 = 10;

const DEFAULT_BRIGHTNESS: u8 = 254;

/// State of one armed episode, shared with the bus listeners
#[derive(Debug, Default)]
struct Episode {
    snapshot: HashMap<u32, LightState>,
    changed_by_command: HashSet<u32>,
}

pub struct HueHook {
    light_ids: Vec<u32>,
    armed_look: LightUpdate,
    bridge: Rc<dyn LightBridge>,
    episode: Rc<RefCell<Episode>>,
}

impl HueHook {
    /// Create the hook and subscribe it to command and settle events
    pub fn new(
        light_ids: Vec<u32>,
        armed_hue: u16,
        armed_transition: u16,
        services: &Services,
    ) -> Result<Self, BuildError> {
        let bridge = services.hue()?;
        let episode = Rc::new(RefCell::new(Episode::default()));

        let changed = Rc::clone(&episode);
        let on_lights_changed: Listener = Rc::new(move |event: &Event| -> anyhow::Result<()> {
            if let Event::LightsChanged { light_ids } = event {
                changed
                    .borrow_mut()
                    .changed_by_command
                    .extend(light_ids.iter().copied());
            }
            Ok(())
        });
        services.bus.subscribe(EventKind::LightsChanged, on_lights_changed);

        let settled = Rc::clone(&episode);
        let restore_bridge = Rc::clone(&bridge);
        let restore_ids = light_ids.clone();
        let on_settled: Listener = Rc::new(move |_event: &Event| -> anyhow::Result<()> {
            restore(&*restore_bridge, &restore_ids, &mut settled.borrow_mut())
        });
        services.bus.subscribe(EventKind::Settled, on_settled);

        Ok(Self {
            light_ids,
            armed_look: LightUpdate {
                on: Some(true),
                hue: Some(armed_hue),
                sat: Some(254),
                bri: Some(100),
                transitiontime: Some(armed_transition),
                ..LightUpdate::default()
            },
            bridge,
            episode,
        })
    }
}

impl Hook for HueHook {
    fn name(&self) -> &'static str {
        "hue"
    }

    fn on_enter_armed(&mut self) -> anyhow::Result<()> {
        let mut snapshot = HashMap::with_capacity(self.light_ids.len());
        for &light in &self.light_ids {
            let state = self
                .bridge
                .light_state(light)
                .with_context(|| format!("failed to snapshot light {light}"))?;
            snapshot.insert(light, state);
        }

        {
            let mut episode = self.episode.borrow_mut();
            episode.snapshot = snapshot;
            episode.changed_by_command.clear();
        }

        for &light in &self.light_ids {
            self.bridge
                .set_light(light, &self.armed_look)
                .with_context(|| format!("failed to show armed colour on light {light}"))?;
        }

        debug!(lights = ?self.light_ids, "armed colour applied");
        Ok(())
    }
}

/// Put untouched lights back the way they were and forget the episode
fn restore(bridge: &dyn LightBridge, light_ids: &[u32], episode: &mut Episode) -> anyhow::Result<()> {
    if episode.snapshot.is_empty() {
        return Ok(());
    }

    let mut restored = 0;
    for &light in light_ids {
        if episode.changed_by_command.contains(&light) {
            continue;
        }
        let Some(saved) = episode.snapshot.get(&light) else {
            continue;
        };
        bridge
            .set_light(light, &restore_update(saved))
            .with_context(|| format!("failed to restore light {light}"))?;
        restored += 1;
    }

    info!(restored, "lights restored after armed episode");

    episode.snapshot.clear();
    episode.changed_by_command.clear();
    Ok(())
}

fn restore_update(saved: &LightState) -> LightUpdate {
    let mut update = LightUpdate {
        transitiontime: Some(RESTORE_TRANSITION),
        ..LightUpdate::default()
    };

    if !saved.on {
        update.on = Some(false);
        return update;
    }

    update.on = Some(true);
    update.bri = Some(saved.bri.unwrap_or(DEFAULT_BRIGHTNESS));
    match saved.colormode.as_deref() {
        Some("hs") if saved.hue.is_some() => {
            update.hue = saved.hue;
            update.sat = saved.sat;
        }
        Some("ct") if saved.ct.is_some() => {
            update.ct = saved.ct;
        }
        _ => {}
    }
    update
}
