// ── Vendor-to-domain conversions ──
//
// Bridges `tracklink_api` payload types into the canonical `model` types.
// Vendor time strings come in several shapes; all end up as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use tracklink_api::{MonitorGroup, MonitorList, VendorPosition};

use crate::model::{Device, Position};

/// Epoch values at or above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Why a vendor position object could not be normalized.
#[derive(Debug, Error)]
pub enum PositionDecodeError {
    #[error("malformed position object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unparseable position time {0:?}")]
    BadTimestamp(String),
}

// ── Time ───────────────────────────────────────────────────────────

/// Parse a vendor time: RFC 3339, `YYYY-MM-DD HH:MM:SS` (taken as UTC),
/// or an epoch in seconds or milliseconds.
pub fn parse_vendor_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    let epoch: i64 = raw.parse().ok()?;
    if epoch >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

// ── Device ─────────────────────────────────────────────────────────

/// Flatten `groups[].devices[]` into devices carrying their group, with
/// `is_online` derived against `now`.
pub fn flatten_monitor_list(
    list: MonitorList,
    now: DateTime<Utc>,
    online_window: chrono::Duration,
) -> Vec<Device> {
    list.groups
        .into_iter()
        .flat_map(|group| devices_in_group(group, now, online_window))
        .collect()
}

fn devices_in_group(
    group: MonitorGroup,
    now: DateTime<Utc>,
    online_window: chrono::Duration,
) -> Vec<Device> {
    let MonitorGroup {
        group_id,
        group_name,
        devices,
    } = group;

    devices
        .into_iter()
        .map(|d| {
            let mut device = Device {
                device_id: d.device_id,
                device_name: d.device_name,
                device_type: d.device_type,
                group_id: group_id.clone(),
                group_name: group_name.clone(),
                status: d.status,
                is_online: false,
                last_active_at: d.last_active_time.as_deref().and_then(parse_vendor_time),
                sim_number: d.sim_number,
            };
            device.is_online = device.online_at(now, online_window);
            device
        })
        .collect()
}

// ── Position ───────────────────────────────────────────────────────

impl TryFrom<&Value> for Position {
    type Error = PositionDecodeError;

    fn try_from(raw: &Value) -> Result<Self, Self::Error> {
        let p = VendorPosition::from_raw(raw)?;
        let timestamp = parse_vendor_time(&p.gps_time)
            .ok_or_else(|| PositionDecodeError::BadTimestamp(p.gps_time.clone()))?;

        let speed = p.speed.unwrap_or(0.0);
        Ok(Self {
            device_id: p.device_id,
            latitude: p.lat,
            longitude: p.lng,
            speed,
            course: p.course.unwrap_or(0.0),
            altitude: p.altitude.unwrap_or(0.0),
            timestamp,
            status_code: p.status_code,
            is_moving: p.moving.unwrap_or(speed > 0.0),
            raw: raw.clone(),
        })
    }
}
