// Vendor API response types
//
// Every vendor action answers with a flat JSON object carrying `status`
// (0 = success) and, on failure, a `cause` string. Action-specific payload
// fields sit next to them. Vendors are loose about scalar types (ids and
// coordinates arrive as numbers or strings), so payload fields go through
// the lenient deserializers below.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// `status` value the vendor uses for success.
pub const SUCCESS_STATUS: i64 = 0;

// ── Response Envelope ────────────────────────────────────────────────

/// A decoded vendor reply, before any business interpretation.
///
/// ```json
/// { "status": 0, "token": "abc", "expiresAt": "2025-01-01T00:00:00Z" }
/// { "status": 10012, "cause": "password error" }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VendorResponse {
    pub status: i64,
    pub cause: Option<String>,
    /// The complete response object, `status` and `cause` included.
    pub body: Value,
}

/// A vendor-reported business failure (`status != 0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorRejection {
    pub status: i64,
    pub cause: String,
}

impl VendorResponse {
    /// Parse a raw response body.
    ///
    /// The body must be a JSON object with an integer `status`. `cause` is
    /// preserved verbatim when present.
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let body: Value = serde_json::from_str(raw).map_err(|e| deser_error(&e, raw))?;

        let status = match body.get("status") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| TransportError::Deserialization {
            message: "response is missing an integer `status` field".into(),
            body: raw.to_owned(),
        })?;

        let cause = body
            .get("cause")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self {
            status,
            cause,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }

    /// The vendor's failure, or `None` on success.
    pub fn rejection(&self) -> Option<VendorRejection> {
        if self.is_success() {
            return None;
        }
        Some(VendorRejection {
            status: self.status,
            cause: self
                .cause
                .clone()
                .unwrap_or_else(|| format!("status={}", self.status)),
        })
    }

    /// Decode the action-specific payload from the response object.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_value(self.body.clone()).map_err(|e| TransportError::Deserialization {
            message: e.to_string(),
            body: self.body.to_string(),
        })
    }
}

fn deser_error(err: &serde_json::Error, raw: &str) -> TransportError {
    let preview: String = raw.chars().take(200).collect();
    TransportError::Deserialization {
        message: format!("{err} (body preview: {preview:?})"),
        body: raw.to_owned(),
    }
}

// ── Login ────────────────────────────────────────────────────────────

/// Payload of a successful `login`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub token: Option<String>,
    /// RFC 3339 expiry, when the vendor reports one.
    #[serde(default, alias = "expires_at", deserialize_with = "lenient_opt_string")]
    pub expires_at: Option<String>,
}

// ── Monitor list ─────────────────────────────────────────────────────

/// Payload of `getMonitorList`: devices nested under their groups.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorList {
    #[serde(default)]
    pub groups: Vec<MonitorGroup>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorGroup {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub group_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub group_name: Option<String>,
    #[serde(default)]
    pub devices: Vec<MonitorDevice>,
}

/// A device entry inside a monitor group.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDevice {
    #[serde(deserialize_with = "lenient_string")]
    pub device_id: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub device_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub device_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub status: Option<String>,
    /// Vendor time string: RFC 3339, `YYYY-MM-DD HH:MM:SS`, or epoch.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub last_active_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub sim_number: Option<String>,
}

impl MonitorList {
    /// Total number of devices across all groups.
    pub fn device_count(&self) -> usize {
        self.groups.iter().map(|g| g.devices.len()).sum()
    }
}

// ── Last position ────────────────────────────────────────────────────

/// Payload of `getLastPosition`.
///
/// Positions are kept as raw JSON so the untransformed vendor object can
/// be stored alongside the normalized one; decode each with
/// [`VendorPosition::from_raw`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastPositionData {
    /// Server-side cursor for incremental queries.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub last_query_time: Option<String>,
    #[serde(default)]
    pub positions: Vec<Value>,
}

/// A single position record as reported by the vendor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPosition {
    #[serde(deserialize_with = "lenient_string")]
    pub device_id: String,
    #[serde(alias = "latitude", deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lon", deserialize_with = "lenient_f64")]
    pub lng: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub speed: Option<f64>,
    #[serde(default, alias = "direction", deserialize_with = "lenient_opt_f64")]
    pub course: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub altitude: Option<f64>,
    #[serde(alias = "timestamp", deserialize_with = "lenient_string")]
    pub gps_time: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub status_code: Option<String>,
    #[serde(default)]
    pub moving: Option<bool>,
}

impl VendorPosition {
    pub fn from_raw(raw: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(raw)
    }
}

// ── Commands ─────────────────────────────────────────────────────────

/// Payload of a successful `sendCommand`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReceipt {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub command_id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

// ── Lenient scalar deserializers ─────────────────────────────────────

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Value::deserialize(de)?;
    scalar_to_string(value).ok_or_else(|| serde::de::Error::custom("expected string or number"))
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value
        .and_then(scalar_to_string)
        .filter(|s| !s.is_empty()))
}

fn lenient_f64<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(de)?;
    scalar_to_f64(&value).ok_or_else(|| serde::de::Error::custom("expected numeric value"))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(scalar_to_f64))
}
