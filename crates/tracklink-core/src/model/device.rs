// ── Device domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked device, flattened out of its vendor group.
///
/// `device_id` is the identity key. `is_online` is derived from
/// `last_active_at` against the freshness window, never taken from the
/// vendor's own status field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub device_name: Option<String>,
    pub device_type: Option<String>,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub status: Option<String>,
    pub is_online: bool,
    pub last_active_at: Option<DateTime<Utc>>,
    pub sim_number: Option<String>,
}

impl Device {
    /// Recompute online-ness for a given instant.
    pub fn online_at(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.last_active_at
            .is_some_and(|seen| seen <= now && now - seen <= window)
    }

    /// Name for display, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or(&self.device_id)
    }
}
