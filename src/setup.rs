//! First-time integration setup (`gesture-daemon configure <integration>`)

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{self, Config};
use crate::integrations::hue::{self, HttpBridge};

/// How long to wait for the bridge's link button
const LINK_BUTTON_WAIT: Duration = Duration::from_secs(30);

/// Discover the Hue bridge, pair with it, list its lights and save the
/// bridge settings
pub fn configure_hue(config_path: Option<&Path>, bridge_ip: Option<String>) -> Result<()> {
    let path = config::resolve_path(config_path).context("no config path, set HOME or pass --config")?;
    let current = if path.exists() {
        Config::from_file(&path)?
    } else {
        Config::default()
    };
    let timeout = current.hue.timeout()?;

    let bridge_ip = match bridge_ip {
        Some(ip) => ip,
        None => hue::discover_bridge(Duration::from_secs(10)).context("bridge discovery failed")?,
    };

    // keep a username already issued by this bridge
    let username = if current.hue.bridge_ip == bridge_ip && !current.hue.username.is_empty() {
        info!(bridge_ip = %bridge_ip, "reusing saved hue username");
        current.hue.username.clone()
    } else {
        println!("Press the link button on the Hue bridge at {bridge_ip} now...");
        hue::pair(&bridge_ip, timeout, LINK_BUTTON_WAIT).context("failed to pair with hue bridge")?
    };

    let bridge = HttpBridge::new(&bridge_ip, &username, timeout)?;
    let lights = bridge.lights().context("failed to list lights")?;

    println!("\nLights on this bridge:");
    for light in &lights {
        println!("  [{}] {}: {}", light.id, light.name, if light.on { "ON" } else { "OFF" });
    }

    config::save_hue_settings(&path, &bridge_ip, &username)?;
    println!("\nHue integration enabled, bridge settings saved to {}", path.display());
    Ok(())
}
