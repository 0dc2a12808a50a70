// ── Sync audit trail ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationType {
    FetchDevices,
    FetchPositions,
    SendCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogStatus {
    Success,
    VendorError,
    TransportError,
}

/// One append-only audit record of a vendor exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub id: Uuid,
    pub operation_type: OperationType,
    pub request_payload: Value,
    pub response_payload: Value,
    pub status: LogStatus,
    pub vendor_status_code: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

impl SyncLogEntry {
    pub fn new(
        operation_type: OperationType,
        request_payload: Value,
        response_payload: Value,
        status: LogStatus,
        vendor_status_code: Option<i64>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_type,
            request_payload,
            response_payload,
            status,
            vendor_status_code,
            timestamp,
        }
    }
}
