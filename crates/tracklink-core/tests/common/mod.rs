// Shared fixtures for tracker integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use uuid::Uuid;

use tracklink_core::{
    Device, ManualClock, MemoryStore, Position, PositionWrite, RecordStore, RetrySettings, Session,
    StoreError, SyncLogEntry, Tracker, TrackerConfig,
};

pub const TOKEN: &str = "abc";
pub const COMMAND_SECRET: &str = "channel-secret";

/// 2024-12-31T00:00:00Z, one day before the vendor's reported expiry.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap()
}

pub struct Harness {
    pub server: MockServer,
    pub tracker: Tracker,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// A second tracker over the same store and clock, as after a restart.
    pub fn restarted(&self) -> Tracker {
        Tracker::with_clock(
            self.tracker.config().clone(),
            Arc::clone(&self.store) as Arc<dyn RecordStore>,
            Arc::clone(&self.clock) as _,
        )
        .unwrap()
    }
}

pub fn test_config(server: &MockServer) -> TrackerConfig {
    TrackerConfig {
        vendor_url: format!("{}/open/api", server.uri()).parse().unwrap(),
        user_id: "user-1".into(),
        timeout: Duration::from_millis(500),
        retry: RetrySettings {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        },
        command_secret: SecretString::from(COMMAND_SECRET),
        ..TrackerConfig::default()
    }
}

pub async fn harness() -> Harness {
    harness_with(|_| {}).await
}

pub async fn harness_with(tweak: impl FnOnce(&mut TrackerConfig)) -> Harness {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    tweak(&mut config);

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let tracker = Tracker::with_clock(
        config,
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::clone(&clock) as _,
    )
    .unwrap();

    Harness {
        server,
        tracker,
        store,
        clock,
    }
}

/// Vendor accepts alice/secret and reports a 2025-01-01 expiry.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(query_param("action", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 0,
            "token": TOKEN,
            "expiresAt": "2025-01-01T00:00:00Z"
        })))
        .mount(server)
        .await;
}

pub async fn login(h: &Harness) -> Session {
    mount_login(&h.server).await;
    h.tracker
        .authenticate("alice", &SecretString::from("secret"))
        .await
        .unwrap()
}

pub fn ok(body: Value) -> ResponseTemplate {
    let mut body = body;
    body["status"] = json!(0);
    ResponseTemplate::new(200).set_body_json(body)
}

/// Two groups, three devices; D1 and D3 active within the last ten minutes.
pub fn monitor_list_body() -> Value {
    json!({
        "groups": [
            {
                "groupId": "G1",
                "groupName": "Vans",
                "devices": [
                    { "deviceId": "D1", "deviceName": "Van 1", "deviceType": "GT06",
                      "status": "1", "lastActiveTime": "2024-12-30 23:55:00", "simNumber": "4477001" },
                    { "deviceId": "D2", "deviceName": "Van 2", "lastActiveTime": "2024-12-30 20:00:00" }
                ]
            },
            {
                "groupId": "G2",
                "groupName": "Trucks",
                "devices": [
                    { "deviceId": "D3", "deviceName": "Truck 1", "lastActiveTime": "2024-12-30T23:58:00Z" }
                ]
            }
        ]
    })
}

pub fn raw_position(device_id: &str, gps_time: &str, lat: f64) -> Value {
    json!({
        "deviceId": device_id,
        "lat": lat,
        "lng": -0.12,
        "speed": 42.0,
        "direction": 180,
        "gpsTime": gps_time
    })
}

// ── Failing store ───────────────────────────────────────────────────

/// Delegates to a `MemoryStore`; individual operations can be switched
/// to fail with `StoreError::Unavailable`.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_activation: AtomicBool,
    /// Number of upcoming position writes to fail.
    pub failing_position_writes: AtomicUsize,
    pub fail_position_reads: AtomicBool,
}

impl FlakyStore {
    fn outage(what: &str) -> StoreError {
        StoreError::Unavailable(format!("{what}: disk full"))
    }

    pub fn fail_next_position_writes(&self, n: usize) {
        self.failing_position_writes.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn activate_session(&self, session: &Session) -> Result<(), StoreError> {
        if self.fail_activation.load(Ordering::SeqCst) {
            return Err(Self::outage("sessions"));
        }
        self.inner.activate_session(session).await
    }
    async fn active_session(&self, user_id: &str) -> Result<Option<Session>, StoreError> {
        self.inner.active_session(user_id).await
    }
    async fn deactivate_session(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.deactivate_session(id).await
    }
    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError> {
        self.inner.upsert_device(device).await
    }
    async fn devices(&self) -> Result<Vec<Device>, StoreError> {
        self.inner.devices().await
    }
    async fn device_count(&self) -> Result<usize, StoreError> {
        self.inner.device_count().await
    }
    async fn upsert_position(&self, position: &Position) -> Result<PositionWrite, StoreError> {
        let failing = self
            .failing_position_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Self::outage("positions"));
        }
        self.inner.upsert_position(position).await
    }
    async fn positions(&self, device_ids: &[String]) -> Result<Vec<Position>, StoreError> {
        if self.fail_position_reads.load(Ordering::SeqCst) {
            return Err(Self::outage("positions"));
        }
        self.inner.positions(device_ids).await
    }
    async fn append_sync_log(&self, entry: &SyncLogEntry) -> Result<(), StoreError> {
        self.inner.append_sync_log(entry).await
    }
    async fn sync_log(&self) -> Result<Vec<SyncLogEntry>, StoreError> {
        self.inner.sync_log().await
    }
}

pub struct FlakyHarness {
    pub server: MockServer,
    pub tracker: Tracker,
    pub store: Arc<FlakyStore>,
}

impl FlakyHarness {
    pub fn restarted(&self) -> Tracker {
        Tracker::with_clock(
            self.tracker.config().clone(),
            Arc::clone(&self.store) as Arc<dyn RecordStore>,
            Arc::new(ManualClock::new(t0())),
        )
        .unwrap()
    }
}

pub async fn flaky_harness() -> FlakyHarness {
    let server = MockServer::start().await;
    let store = Arc::new(FlakyStore::default());
    let tracker = Tracker::with_clock(
        test_config(&server),
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(ManualClock::new(t0())),
    )
    .unwrap();
    FlakyHarness {
        server,
        tracker,
        store,
    }
}
