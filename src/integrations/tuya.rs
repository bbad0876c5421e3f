//! Tuya cloud client
//!
//! Infrared air conditioners are driven through an IR gateway registered in
//! the Tuya cloud. Every request is signed with HMAC-SHA256 over the method,
//! body digest and path; business calls also carry a short-lived access token
//! fetched from `/v1.0/token`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Refresh the token this long before the cloud expires it
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

const TOKEN_PATH: &str = "/v1.0/token?grant_type=1";

/// Cloud regions and their API hosts
const REGIONS: [(&str, &str); 6] = [
    ("cn", "https://openapi.tuyacn.com"),
    ("us", "https://openapi.tuyaus.com"),
    ("us-e", "https://openapi-ueaz.tuyaus.com"),
    ("eu", "https://openapi.tuyaeu.com"),
    ("eu-w", "https://openapi-weaz.tuyaeu.com"),
    ("in", "https://openapi.tuyain.com"),
];

/// API host for a region code
pub fn endpoint(region: &str) -> Option<&'static str> {
    REGIONS
        .iter()
        .find(|(code, _)| *code == region)
        .map(|(_, host)| *host)
}

/// Device category as configured by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    InfraredAc,
    #[serde(other)]
    Other,
}

/// One `[tuya.devices.<name>]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TuyaDevice {
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub id: String,
    /// IR gateway the remote is paired with (infrared devices only)
    #[serde(default)]
    pub gateway_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<u32>,
    #[serde(default)]
    pub remote_index: Option<u32>,
}

/// Errors talking to the Tuya cloud
#[derive(Debug, thiserror::Error)]
pub enum TuyaError {
    #[error("tuya request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tuya cloud rejected {path}: {msg} (code {code})")]
    Api { path: String, code: i64, msg: String },

    #[error("unknown tuya device {0}")]
    UnknownDevice(String),

    #[error("tuya device {0} is not a configured infrared AC")]
    NotInfraredAc(String),

    #[error("unknown tuya region {0}")]
    UnknownRegion(String),

    #[error("tuya api secret cannot be used as a signing key")]
    InvalidSecret,
}

/// Key presses on infrared remotes, addressed by configured device name
pub trait InfraredRemote {
    fn press_key(&self, device: &str, key: &str) -> Result<(), TuyaError>;
}

/// Envelope of every cloud reply
#[derive(Debug, Deserialize)]
struct CloudReply {
    success: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    /// Lifetime in seconds
    expire_time: u64,
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// Blocking client for one Tuya cloud project
pub struct TuyaCloud {
    client: reqwest::blocking::Client,
    endpoint: &'static str,
    api_key: String,
    api_secret: String,
    devices: HashMap<String, TuyaDevice>,
    token: RefCell<Option<AccessToken>>,
}

impl TuyaCloud {
    pub fn new(
        api_key: &str,
        api_secret: &str,
        region: &str,
        devices: HashMap<String, TuyaDevice>,
        timeout: Duration,
    ) -> Result<Self, TuyaError> {
        let endpoint = endpoint(region).ok_or_else(|| TuyaError::UnknownRegion(region.to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            devices,
            token: RefCell::new(None),
        })
    }

    /// Current access token, fetching a new one when missing or stale
    fn access_token(&self) -> Result<String, TuyaError> {
        if let Some(token) = self.token.borrow().as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let result = self.send(Method::GET, TOKEN_PATH, None, None)?;
        let grant: TokenGrant = serde_json::from_value(result).map_err(|_| TuyaError::Api {
            path: TOKEN_PATH.to_string(),
            code: 0,
            msg: "malformed token grant".to_string(),
        })?;
        debug!(expires_in = grant.expire_time, "tuya access token granted");

        let lifetime = Duration::from_secs(grant.expire_time).saturating_sub(TOKEN_MARGIN);
        *self.token.borrow_mut() = Some(AccessToken {
            value: grant.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(grant.access_token)
    }

    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, TuyaError> {
        let token = self.access_token()?;
        self.send(method, path, body, Some(&token))
    }

    /// Sign and send one request, returning the reply's `result`
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, TuyaError> {
        let body = body.map(Value::to_string).unwrap_or_default();
        let t = unix_millis().to_string();
        let payload = format!(
            "{}{}{}{}",
            self.api_key,
            token.unwrap_or_default(),
            t,
            string_to_sign(method.as_str(), &body, path)
        );

        let mut request = self
            .client
            .request(method, format!("{}{path}", self.endpoint))
            .header("client_id", &self.api_key)
            .header("sign", sign(&self.api_secret, &payload)?)
            .header("sign_method", "HMAC-SHA256")
            .header("t", t);
        if let Some(token) = token {
            request = request.header("access_token", token);
        }
        if !body.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let reply: CloudReply = request.send()?.error_for_status()?.json()?;
        if !reply.success {
            return Err(TuyaError::Api {
                path: path.to_string(),
                code: reply.code,
                msg: reply.msg,
            });
        }
        Ok(reply.result)
    }
}

impl InfraredRemote for TuyaCloud {
    fn press_key(&self, device: &str, key: &str) -> Result<(), TuyaError> {
        let (path, body) = ir_ac_command(&self.devices, device, key)?;
        self.request(Method::POST, &path, Some(&body))?;
        info!(device, key, "infrared key sent");
        Ok(())
    }
}

/// Path and body of an IR AC key press for a configured device
fn ir_ac_command(
    devices: &HashMap<String, TuyaDevice>,
    name: &str,
    key: &str,
) -> Result<(String, Value), TuyaError> {
    let device = devices
        .get(name)
        .ok_or_else(|| TuyaError::UnknownDevice(name.to_string()))?;

    let not_ac = || TuyaError::NotInfraredAc(name.to_string());
    if device.kind != DeviceKind::InfraredAc {
        return Err(not_ac());
    }
    let gateway = device.gateway_id.as_deref().ok_or_else(not_ac)?;
    let category = device.category_id.ok_or_else(not_ac)?;
    let remote_index = device.remote_index.ok_or_else(not_ac)?;

    Ok((
        format!("/v2.0/infrareds/{gateway}/remotes/{}/command", device.id),
        json!({ "key": key, "categoryId": category, "remoteIndex": remote_index }),
    ))
}

/// `METHOD\nSHA256(body)\n\nPATH`; no custom headers are signed
fn string_to_sign(method: &str, body: &str, path: &str) -> String {
    format!("{method}\n{}\n\n{path}", hex(&Sha256::digest(body.as_bytes())))
}

/// Uppercase hex HMAC-SHA256 of `payload`
fn sign(secret: &str, payload: &str) -> Result<String, TuyaError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| TuyaError::InvalidSecret)?;
    mac.update(payload.as_bytes());
    Ok(hex(&mac.finalize().into_bytes()).to_uppercase())
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}
