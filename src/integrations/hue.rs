//! Philips Hue bridge client
//!
//! Talks to the bridge's local REST API:
//! `GET  http://<ip>/api/<username>/lights/<id>` for state and
//! `PUT  http://<ip>/api/<username>/lights/<id>/state` for changes.
//! Calls block the caller until the bridge answers.
//!
//! First-time setup uses the Philips discovery service to find the bridge and
//! `POST http://<ip>/api` to create a username once the link button is
//! pressed.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

/// N-UPnP discovery service listing bridges on the caller's network
pub const DISCOVERY_URL: &str = "https://discovery.meethue.com/";

/// Bridge error type returned while the link button has not been pressed
const LINK_BUTTON_NOT_PRESSED: u64 = 101;

const PAIRING_RETRY: Duration = Duration::from_secs(1);

/// Light state as reported by the bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LightState {
    pub on: bool,
    pub bri: Option<u8>,
    pub hue: Option<u16>,
    pub sat: Option<u8>,
    pub ct: Option<u16>,
    /// `hs`, `ct` or `xy`
    pub colormode: Option<String>,
}

/// Partial state change; unset fields are left alone by the bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,
    /// Fade duration in tenths of a second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transitiontime: Option<u16>,
}

impl LightUpdate {
    pub fn on() -> Self {
        Self {
            on: Some(true),
            ..Self::default()
        }
    }

    pub fn off() -> Self {
        Self {
            on: Some(false),
            ..Self::default()
        }
    }
}

/// Errors talking to a bridge
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bridge rejected request for light {light}: {description}")]
    Api { light: u32, description: String },

    #[error("unexpected bridge response for light {light}")]
    Malformed { light: u32 },

    #[error("no hue bridge found on the local network")]
    NotFound,

    #[error("link button was not pressed within {0:?}")]
    LinkButtonTimeout(Duration),

    #[error("bridge rejected request: {0}")]
    Rejected(String),

    #[error("unexpected bridge response: {0}")]
    Unexpected(String),
}

/// One light as listed by the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightSummary {
    pub id: u32,
    pub name: String,
    pub on: bool,
}

/// Light control surface used by commands and hooks
pub trait LightBridge {
    fn light_state(&self, light: u32) -> Result<LightState, BridgeError>;

    fn set_light(&self, light: u32, update: &LightUpdate) -> Result<(), BridgeError>;
}

/// Blocking HTTP client for one bridge
pub struct HttpBridge {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpBridge {
    pub fn new(bridge_ip: &str, username: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("http://{bridge_ip}/api/{username}"),
        })
    }

    /// Every light registered on the bridge, ordered by id
    pub fn lights(&self) -> Result<Vec<LightSummary>, BridgeError> {
        let url = format!("{}/lights", self.base_url);
        let body: Value = self.client.get(&url).send()?.error_for_status()?.json()?;
        parse_lights(&body)
    }
}

/// Ask the discovery service for the first bridge's internal IP
pub fn discover_bridge(timeout: Duration) -> Result<String, BridgeError> {
    info!("discovering hue bridge on local network");
    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    let body: Value = client.get(DISCOVERY_URL).send()?.error_for_status()?.json()?;

    let ip = first_bridge_ip(&body)?;
    info!(bridge_ip = %ip, "found hue bridge");
    Ok(ip)
}

/// Create a username on the bridge, retrying until the link button is
/// pressed or `wait` runs out
pub fn pair(bridge_ip: &str, timeout: Duration, wait: Duration) -> Result<String, BridgeError> {
    let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    let url = format!("http://{bridge_ip}/api");
    let request = json!({ "devicetype": "gesture-daemon#daemon" });
    let deadline = Instant::now() + wait;

    info!(bridge_ip, "press the link button on the hue bridge");
    loop {
        let body: Value = client.post(&url).json(&request).send()?.error_for_status()?.json()?;
        match pairing_reply(&body)? {
            Some(username) => {
                info!(bridge_ip, "paired with hue bridge");
                return Ok(username);
            }
            None if Instant::now() >= deadline => return Err(BridgeError::LinkButtonTimeout(wait)),
            None => std::thread::sleep(PAIRING_RETRY),
        }
    }
}

fn error_description(error: &Value) -> String {
    error
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string()
}

/// `[{"internalipaddress": "..."}, ...]`
fn first_bridge_ip(body: &Value) -> Result<String, BridgeError> {
    body.as_array()
        .and_then(|bridges| bridges.first())
        .and_then(|bridge| bridge.get("internalipaddress"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(BridgeError::NotFound)
}

/// Username on success, `None` while the link button is still unpressed
fn pairing_reply(body: &Value) -> Result<Option<String>, BridgeError> {
    let entry = body
        .as_array()
        .and_then(|entries| entries.first())
        .ok_or_else(|| BridgeError::Unexpected(body.to_string()))?;

    if let Some(username) = entry.pointer("/success/username").and_then(Value::as_str) {
        return Ok(Some(username.to_string()));
    }
    match entry.get("error") {
        Some(error) if error.get("type").and_then(Value::as_u64) == Some(LINK_BUTTON_NOT_PRESSED) => Ok(None),
        Some(error) => Err(BridgeError::Rejected(error_description(error))),
        None => Err(BridgeError::Unexpected(body.to_string())),
    }
}

/// `{"<id>": {"name": ..., "state": {"on": ...}}, ...}`
fn parse_lights(body: &Value) -> Result<Vec<LightSummary>, BridgeError> {
    if let Some(error) = body.as_array().and_then(|entries| entries.iter().find_map(|e| e.get("error"))) {
        return Err(BridgeError::Rejected(error_description(error)));
    }
    let lights = body
        .as_object()
        .ok_or_else(|| BridgeError::Unexpected(body.to_string()))?;

    let mut by_id = BTreeMap::new();
    for (id, light) in lights {
        let Ok(id) = id.parse::<u32>() else {
            continue;
        };
        by_id.insert(
            id,
            LightSummary {
                id,
                name: light.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                on: light.pointer("/state/on").and_then(Value::as_bool).unwrap_or(false),
            },
        );
    }
    Ok(by_id.into_values().collect())
}

impl LightBridge for HttpBridge {
    fn light_state(&self, light: u32) -> Result<LightState, BridgeError> {
        let url = format!("{}/lights/{light}", self.base_url);
        debug!(light, "fetching light state");

        let body: Value = self.client.get(&url).send()?.error_for_status()?.json()?;
        check_response(light, &body)?;

        let state = body
            .get("state")
            .cloned()
            .ok_or(BridgeError::Malformed { light })?;
        serde_json::from_value(state).map_err(|_| BridgeError::Malformed { light })
    }

    fn set_light(&self, light: u32, update: &LightUpdate) -> Result<(), BridgeError> {
        let url = format!("{}/lights/{light}/state", self.base_url);
        debug!(light, ?update, "setting light state");

        let body: Value = self
            .client
            .put(&url)
            .json(update)
            .send()?
            .error_for_status()?
            .json()?;
        check_response(light, &body)
    }
}

/// The bridge answers 200 with `[{"error": {...}}]` entries on failure
fn check_response(light: u32, body: &Value) -> Result<(), BridgeError> {
    let Some(entries) = body.as_array() else {
        return Ok(());
    };

    match entries.iter().find_map(|e| e.get("error")) {
        Some(error) => Err(BridgeError::Api {
            light,
            description: error_description(error),
        }),
        None => Ok(()),
    }
}
