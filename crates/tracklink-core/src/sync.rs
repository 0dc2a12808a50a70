// ── Device/position sync ──
//
// Pulls device lists and position snapshots from the vendor, normalizes
// them, and writes them through to the record store. The position read
// path prefers live data but answers from the store when the vendor
// cannot be reached.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use tracklink_api::actions::{action, last_position_payload};
use tracklink_api::{LastPositionData, MonitorList, TransportError, VendorClient, VendorResponse};

use crate::clock::Clock;
use crate::config::{TrackerConfig, chrono_duration};
use crate::convert::flatten_monitor_list;
use crate::error::SyncError;
use crate::model::{Device, LogStatus, OperationType, Position, SyncLogEntry};
use crate::session::SessionManager;
use crate::store::{PositionWrite, RecordStore};

/// Cursor key used when no device filter is given.
const ALL_DEVICES_KEY: &str = "*";

/// What to ask the vendor for in a position fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionQuery {
    /// Restrict to these devices; `None` (or empty) means every device.
    pub device_ids: Option<Vec<String>>,
    /// Send the stored `lastQueryTime` cursor so only deltas come back.
    pub incremental: bool,
}

impl PositionQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn devices(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            device_ids: Some(ids.into_iter().map(Into::into).collect()),
            incremental: false,
        }
    }

    pub fn incremental(mut self) -> Self {
        self.incremental = true;
        self
    }

    /// Deduplicated ids in first-seen order, `None` for "all devices".
    fn normalized_ids(&self) -> Option<Vec<String>> {
        let ids: IndexSet<&str> = self
            .device_ids
            .as_deref()?
            .iter()
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            None
        } else {
            Some(ids.into_iter().map(str::to_owned).collect())
        }
    }
}

/// Cursor identity for a device set: order-insensitive.
fn cursor_key(ids: Option<&[String]>) -> String {
    match ids {
        None => ALL_DEVICES_KEY.to_owned(),
        Some(ids) => {
            let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
            sorted.sort_unstable();
            sorted.dedup();
            sorted.join(",")
        }
    }
}

/// Result of a live, non-persisting device-list probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSample {
    pub online_count: usize,
    pub response_time: Duration,
}

/// Device and position synchronisation for one vendor account.
#[derive(Debug)]
pub struct SyncService {
    client: Arc<VendorClient>,
    session: Arc<SessionManager>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    online_window: chrono::Duration,
    /// Process-local `lastQueryTime` cursors, keyed by device set.
    cursors: DashMap<String, String>,
}

impl SyncService {
    pub fn new(
        client: Arc<VendorClient>,
        session: Arc<SessionManager>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            client,
            session,
            store,
            clock,
            online_window: chrono_duration(config.online_window),
            cursors: DashMap::new(),
        }
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Fetch the vendor's device list, flatten it, and upsert every device.
    pub async fn fetch_devices(&self) -> Result<Vec<Device>, SyncError> {
        let token = self.session.current_token().ok_or(SyncError::Unauthenticated)?;
        let request = json!({});

        let resp = self.client.monitor_list(&token).await;
        let list: MonitorList = self
            .interpret(OperationType::FetchDevices, &request, resp)
            .await?;
        debug!(listed = list.device_count(), "received monitor list");

        // Last entry wins when the vendor lists a device in two groups.
        let devices: IndexMap<String, Device> =
            flatten_monitor_list(list, self.clock.now(), self.online_window)
                .into_iter()
                .map(|d| (d.device_id.clone(), d))
                .collect();

        let devices: Vec<Device> = devices.into_values().collect();
        self.store.upsert_devices(&devices).await?;
        self.record(SyncLogEntry::new(
            OperationType::FetchDevices,
            request,
            json!({ "status": 0, "deviceCount": devices.len() }),
            LogStatus::Success,
            Some(tracklink_api::SUCCESS_STATUS),
            self.clock.now(),
        ))
        .await;

        info!(
            devices = devices.len(),
            online = devices.iter().filter(|d| d.is_online).count(),
            "device list synced"
        );
        Ok(devices)
    }

    // ── Positions ────────────────────────────────────────────────────

    /// Fetch last positions and upsert them through the stale-write guard.
    ///
    /// Returns only the positions the store accepted.
    pub async fn fetch_positions(&self, query: &PositionQuery) -> Result<Vec<Position>, SyncError> {
        let token = self.session.current_token().ok_or(SyncError::Unauthenticated)?;

        let ids = query.normalized_ids();
        let key = cursor_key(ids.as_deref());
        let cursor = if query.incremental {
            self.cursors.get(&key).map(|c| c.value().clone())
        } else {
            None
        };
        let request = last_position_payload(ids.as_deref(), cursor.as_deref());

        let resp = self
            .client
            .last_positions(&token, ids.as_deref(), cursor.as_deref())
            .await;
        let data: LastPositionData = self
            .interpret(OperationType::FetchPositions, &request, resp)
            .await?;

        let received = data.positions.len();
        let decoded: Vec<Position> = data
            .positions
            .iter()
            .filter_map(|raw| {
                Position::try_from(raw)
                    .inspect_err(|e| warn!(error = %e, "skipping malformed vendor position"))
                    .ok()
            })
            .collect();

        let outcomes = self.store.upsert_positions(&decoded).await?;
        let mut accepted = Vec::with_capacity(decoded.len());
        for (position, outcome) in decoded.into_iter().zip(outcomes) {
            match outcome {
                PositionWrite::Rejected { stored } => debug!(
                    device_id = %position.device_id,
                    incoming = %position.timestamp,
                    %stored,
                    "rejected stale position"
                ),
                PositionWrite::Inserted | PositionWrite::Updated => accepted.push(position),
            }
        }

        // Only advance once everything the cursor covers is stored.
        if let Some(next) = data.last_query_time {
            debug!(cursor = %next, devices = %key, "stored position cursor");
            self.cursors.insert(key, next);
        }

        self.record(SyncLogEntry::new(
            OperationType::FetchPositions,
            request,
            json!({ "status": 0, "received": received, "accepted": accepted.len() }),
            LogStatus::Success,
            Some(tracklink_api::SUCCESS_STATUS),
            self.clock.now(),
        ))
        .await;

        debug!(received, accepted = accepted.len(), incremental = cursor.is_some(), "positions synced");
        Ok(accepted)
    }

    /// Last known position per device, live when possible.
    ///
    /// Any live failure is logged and the answer comes from the store.
    /// Devices with no stored position are absent from the map. Only a
    /// store failure on the read path is returned.
    pub async fn get_multiple_devices_last_positions(
        &self,
        device_ids: &[String],
    ) -> Result<IndexMap<String, Position>, SyncError> {
        let query = PositionQuery::devices(device_ids.iter().cloned());
        let Some(ids) = query.normalized_ids() else {
            return Ok(IndexMap::new());
        };

        if let Err(e) = self.fetch_positions(&query).await {
            warn!(error = %e, devices = ids.len(), "live position fetch failed, answering from store");
        }

        let stored = self.store.positions(&ids).await?;
        Ok(stored
            .into_iter()
            .map(|p| (p.device_id.clone(), p))
            .collect())
    }

    // ── Health sampling ──────────────────────────────────────────────

    /// One live device-list call, single attempt, nothing persisted.
    pub async fn probe(&self) -> Result<ProbeSample, SyncError> {
        let token = self.session.current_token().ok_or(SyncError::Unauthenticated)?;

        let started = Instant::now();
        let resp = self
            .client
            .send_once(action::MONITOR_LIST, &json!({}), Some(&token))
            .await?;
        let response_time = started.elapsed();

        if let Some(rejection) = resp.rejection() {
            return Err(rejection.into());
        }
        let list: MonitorList = resp.decode()?;
        let devices = flatten_monitor_list(list, self.clock.now(), self.online_window);

        Ok(ProbeSample {
            online_count: devices.iter().filter(|d| d.is_online).count(),
            response_time,
        })
    }

    /// Online devices in the store, re-derived against the current time.
    pub async fn stored_active_device_count(&self) -> Result<usize, SyncError> {
        let now = self.clock.now();
        let devices = self.store.devices().await?;
        Ok(devices
            .iter()
            .filter(|d| d.online_at(now, self.online_window))
            .count())
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Turn a vendor reply into a typed payload, auditing failures.
    async fn interpret<T: serde::de::DeserializeOwned>(
        &self,
        operation: OperationType,
        request: &Value,
        resp: Result<VendorResponse, TransportError>,
    ) -> Result<T, SyncError> {
        let failure = match resp {
            Ok(resp) => match resp.rejection() {
                None => match resp.decode::<T>() {
                    Ok(payload) => return Ok(payload),
                    Err(e) => (json!({ "error": e.to_string() }), None, SyncError::from(e)),
                },
                Some(rejection) => (
                    resp.body.clone(),
                    Some(rejection.status),
                    SyncError::from(rejection),
                ),
            },
            Err(e) => (json!({ "error": e.to_string() }), None, SyncError::from(e)),
        };

        let (response, vendor_status, err) = failure;
        let status = if vendor_status.is_some() {
            LogStatus::VendorError
        } else {
            LogStatus::TransportError
        };
        self.record(SyncLogEntry::new(
            operation,
            request.clone(),
            response,
            status,
            vendor_status,
            self.clock.now(),
        ))
        .await;
        Err(err)
    }

    /// Append to the audit trail; a failed write is logged, not returned.
    async fn record(&self, entry: SyncLogEntry) {
        if let Err(e) = self.store.append_sync_log(&entry).await {
            warn!(error = %e, operation = %entry.operation_type, "failed to append sync log entry");
        }
    }
}
