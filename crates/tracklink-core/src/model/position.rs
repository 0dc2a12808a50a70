// ── Position domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Last known position of one device.
///
/// Upserted per `device_id`; `raw` keeps the untransformed vendor object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// km/h
    pub speed: f64,
    /// Degrees from north.
    pub course: f64,
    /// Metres.
    pub altitude: f64,
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<String>,
    pub is_moving: bool,
    pub raw: Value,
}
