// ── Tracker facade ──
//
// Wires the vendor client, session manager, sync service, health monitor
// and command dispatcher for one application user, and exposes the
// operations the host application calls.

use std::sync::Arc;

use indexmap::IndexMap;
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::debug;

use tracklink_api::{TransportError, VendorClient};

use crate::clock::{Clock, SystemClock};
use crate::config::{TrackerConfig, chrono_duration};
use crate::dispatch::{CommandDispatcher, CommandOutcome};
use crate::error::{AuthError, DispatchError, StoreError, SyncError};
use crate::health::HealthMonitor;
use crate::model::{Device, HealthStatus, Position, Session, SessionState, SyncLogEntry};
use crate::session::SessionManager;
use crate::store::RecordStore;
use crate::sync::{PositionQuery, SyncService};

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<TrackerInner>`. Constructing a tracker
/// does not contact the vendor; call [`authenticate`](Self::authenticate)
/// or [`load_existing_session`](Self::load_existing_session) first.
#[derive(Debug, Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug)]
struct TrackerInner {
    config: TrackerConfig,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    session: Arc<SessionManager>,
    sync: Arc<SyncService>,
    health: HealthMonitor,
    dispatcher: CommandDispatcher,
}

impl Tracker {
    /// Build a tracker on the wall clock.
    pub fn new(config: TrackerConfig, store: Arc<dyn RecordStore>) -> Result<Self, TransportError> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build a tracker with an explicit time source.
    pub fn with_clock(
        config: TrackerConfig,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TransportError> {
        let client = Arc::new(VendorClient::new(
            config.vendor_url.clone(),
            &config.transport(),
            config.backoff(),
        )?);

        let session = Arc::new(SessionManager::new(
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&clock),
            &config,
        ));
        let sync = Arc::new(SyncService::new(
            Arc::clone(&client),
            Arc::clone(&session),
            Arc::clone(&store),
            Arc::clone(&clock),
            &config,
        ));
        let health = HealthMonitor::new(
            Arc::clone(&session),
            Arc::clone(&sync),
            Arc::clone(&clock),
            &config,
        );
        let dispatcher = CommandDispatcher::new(
            client,
            Arc::clone(&session),
            Arc::clone(&store),
            Arc::clone(&clock),
            config.command_secret.clone(),
        );

        debug!(vendor_url = %config.vendor_url, user_id = %config.user_id, "tracker constructed");
        Ok(Self {
            inner: Arc::new(TrackerInner {
                config,
                store,
                clock,
                session,
                sync,
                health,
                dispatcher,
            }),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    // ── Session lifecycle ────────────────────────────────────────────

    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        let result = self.inner.session.authenticate(username, password).await;
        if result.is_ok() {
            self.inner.health.clear_health_cache();
        }
        result
    }

    pub async fn load_existing_session(&self) -> Result<Option<Session>, StoreError> {
        let restored = self.inner.session.load_existing_session().await?;
        self.inner.health.clear_health_cache();
        Ok(restored)
    }

    pub fn refresh_session(&self) -> bool {
        self.inner.session.refresh_session()
    }

    pub async fn logout(&self) {
        self.inner.session.logout().await;
        self.inner.health.clear_health_cache();
    }

    /// The held session, valid or not.
    pub fn session(&self) -> Option<Session> {
        self.inner.session.current_session()
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.session.state()
    }

    pub fn subscribe_session_state(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe_state()
    }

    // ── Sync ─────────────────────────────────────────────────────────

    pub async fn fetch_devices(&self) -> Result<Vec<Device>, SyncError> {
        self.inner.sync.fetch_devices().await
    }

    pub async fn fetch_positions(&self, query: &PositionQuery) -> Result<Vec<Position>, SyncError> {
        self.inner.sync.fetch_positions(query).await
    }

    pub async fn get_multiple_devices_last_positions(
        &self,
        device_ids: &[String],
    ) -> Result<IndexMap<String, Position>, SyncError> {
        self.inner
            .sync
            .get_multiple_devices_last_positions(device_ids)
            .await
    }

    // ── Health ───────────────────────────────────────────────────────

    pub async fn get_connection_health(&self) -> HealthStatus {
        self.inner.health.get_connection_health().await
    }

    pub fn clear_health_cache(&self) {
        self.inner.health.clear_health_cache();
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn send_command(
        &self,
        device_id: &str,
        command: &str,
        params: &[String],
    ) -> Result<CommandOutcome, DispatchError> {
        self.inner
            .dispatcher
            .send_command(device_id, command, params)
            .await
    }

    // ── Stored data ──────────────────────────────────────────────────

    /// Devices in the store, with `is_online` re-derived for the current time.
    pub async fn stored_devices(&self) -> Result<Vec<Device>, StoreError> {
        let now = self.inner.clock.now();
        let window = chrono_duration(self.inner.config.online_window);
        let mut devices = self.inner.store.devices().await?;
        for device in &mut devices {
            device.is_online = device.online_at(now, window);
        }
        Ok(devices)
    }

    pub async fn sync_log(&self) -> Result<Vec<SyncLogEntry>, StoreError> {
        self.inner.store.sync_log().await
    }
}
