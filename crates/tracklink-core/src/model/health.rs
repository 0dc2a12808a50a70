// ── Connection health ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived view of whether the vendor integration is usable. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub is_connected: bool,
    pub token_valid: bool,
    pub session_valid: bool,
    pub active_device_count: usize,
    pub response_time_ms: Option<u64>,
    /// Every failure reason, joined with `"; "`.
    pub error_message: Option<String>,
    pub computed_at: DateTime<Utc>,
}
