//! Configuration loading and management
//!
//! A TOML file supplies timings, the Hue bridge, the Tuya cloud project,
//! gesture bindings and hooks. Timings may be overridden from the environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::commands::GestureBinding;
use crate::controller::Timings;
use crate::hooks::HookSpec;
use crate::integrations::tuya::{self, TuyaDevice};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "GESTURE_DAEMON_CONFIG";

/// Errors loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{var}={value:?} is not a number")]
    Env { var: &'static str, value: String },

    #[error("timing {field} must be a positive number of seconds, got {value}")]
    InvalidTiming { field: &'static str, value: f64 },

    #[error("failed to write config file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config file {path}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("hue is enabled but {0} is not set")]
    HueIncomplete(&'static str),

    #[error("tuya is enabled but {0} is not set")]
    TuyaIncomplete(&'static str),

    #[error("unknown tuya region {0:?}")]
    TuyaRegion(String),
}

/// Daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub timing: TimingConfig,
    pub hue: HueConfig,
    pub tuya: TuyaConfig,
    pub gestures: Vec<GestureBinding>,
    pub hooks: Vec<HookSpec>,
}

/// `[timing]`, all in seconds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub wake_hold_secs: f64,
    pub hold_secs: f64,
    pub armed_timeout_secs: f64,
    pub debounce_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wake_hold_secs: 1.0,
            hold_secs: 1.0,
            armed_timeout_secs: 5.0,
            debounce_secs: 2.0,
        }
    }
}

/// `[hue]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HueConfig {
    pub enabled: bool,
    pub bridge_ip: String,
    pub username: String,
    /// Per-request timeout
    pub timeout_secs: f64,
}

impl Default for HueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bridge_ip: String::new(),
            username: String::new(),
            timeout_secs: 5.0,
        }
    }
}

impl HueConfig {
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        seconds("hue.timeout_secs", self.timeout_secs)
    }
}

/// `[tuya]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TuyaConfig {
    pub enabled: bool,
    pub api_key: String,
    pub api_secret: String,
    /// Cloud region code such as `us` or `eu`
    pub api_region: String,
    /// Per-request timeout
    pub timeout_secs: f64,
    /// Devices by the name gesture bindings use
    pub devices: HashMap<String, TuyaDevice>,
}

impl Default for TuyaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            api_secret: String::new(),
            api_region: "us".to_string(),
            timeout_secs: 5.0,
            devices: HashMap::new(),
        }
    }
}

impl TuyaConfig {
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        seconds("tuya.timeout_secs", self.timeout_secs)
    }
}

impl Config {
    /// Load from `explicit`, `$GESTURE_DAEMON_CONFIG` or the default path,
    /// then apply environment overrides and validate
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // a file named on the command line or in the environment must exist
        let named = explicit.is_some() || std::env::var_os(CONFIG_ENV).is_some();
        let mut config = match resolve_path(explicit) {
            Some(path) if named || path.exists() => Self::from_file(&path)?,
            _ => {
                info!("no config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse one file, without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Override timings from `GESTURE_*_SECS` variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let timing = &mut self.timing;
        let overrides: [(&'static str, &mut f64); 4] = [
            ("GESTURE_WAKE_HOLD_SECS", &mut timing.wake_hold_secs),
            ("GESTURE_HOLD_SECS", &mut timing.hold_secs),
            ("GESTURE_ARMED_TIMEOUT_SECS", &mut timing.armed_timeout_secs),
            ("GESTURE_DEBOUNCE_SECS", &mut timing.debounce_secs),
        ];

        for (var, slot) in overrides {
            let Some(value) = lookup(var) else {
                continue;
            };
            *slot = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var, value })?;
            debug!(var, value = *slot, "timing overridden from environment");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timings()?;
        if self.hue.enabled {
            if self.hue.bridge_ip.is_empty() {
                return Err(ConfigError::HueIncomplete("bridge_ip"));
            }
            if self.hue.username.is_empty() {
                return Err(ConfigError::HueIncomplete("username"));
            }
            self.hue.timeout()?;
        }
        if self.tuya.enabled {
            if self.tuya.api_key.is_empty() {
                return Err(ConfigError::TuyaIncomplete("api_key"));
            }
            if self.tuya.api_secret.is_empty() {
                return Err(ConfigError::TuyaIncomplete("api_secret"));
            }
            if tuya::endpoint(&self.tuya.api_region).is_none() {
                return Err(ConfigError::TuyaRegion(self.tuya.api_region.clone()));
            }
            self.tuya.timeout()?;
        }
        Ok(())
    }

    pub fn timings(&self) -> Result<Timings, ConfigError> {
        let t = &self.timing;
        Ok(Timings {
            wake_hold: seconds("wake_hold_secs", t.wake_hold_secs)?,
            hold: seconds("hold_secs", t.hold_secs)?,
            armed_timeout: seconds("armed_timeout_secs", t.armed_timeout_secs)?,
            debounce: seconds("debounce_secs", t.debounce_secs)?,
        })
    }
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::InvalidTiming { field, value });
    }
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidTiming { field, value })
}

/// Config file in effect: `explicit`, then `$GESTURE_DAEMON_CONFIG`, then
/// the default path
pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(default_path)
}

/// Enable Hue and store the bridge address and username in `path`
///
/// Only the `[hue]` table is touched; the rest of the file is kept. The file
/// and its directory are created when missing.
pub fn save_hue_settings(path: &Path, bridge_ip: &str, username: &str) -> Result<(), ConfigError> {
    let mut doc = if path.exists() {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse::<toml::Table>().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        toml::Table::new()
    };

    let hue = doc
        .entry("hue")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    if !hue.is_table() {
        *hue = toml::Value::Table(toml::Table::new());
    }
    if let toml::Value::Table(hue) = hue {
        hue.insert("enabled".to_string(), toml::Value::Boolean(true));
        hue.insert("bridge_ip".to_string(), toml::Value::String(bridge_ip.to_string()));
        hue.insert("username".to_string(), toml::Value::String(username.to_string()));
    }

    let text = toml::to_string(&doc).map_err(|source| ConfigError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    std::fs::write(path, text).map_err(write_err)?;

    info!(path = %path.display(), bridge_ip, "hue settings saved");
    Ok(())
}

/// `$HOME/.config/gesture-daemon/config.toml`
fn default_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("gesture-daemon")
            .join("config.toml"),
    )
}
