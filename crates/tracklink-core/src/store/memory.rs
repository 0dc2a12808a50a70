// ── In-memory record store ──

use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collection::{RecordCollection, Upsert};
use super::{PositionWrite, RecordStore};
use crate::error::StoreError;
use crate::model::{Device, Position, Session, SyncLogEntry};

/// Process-local store backed by concurrent maps.
#[derive(Debug)]
pub struct MemoryStore {
    sessions: RecordCollection<Session>,
    devices: RecordCollection<Device>,
    positions: RecordCollection<Position>,
    sync_log: RwLock<Vec<SyncLogEntry>>,
    /// Serializes session activation across users' rows.
    session_writes: Mutex<()>,
}

/// Serializable image of a store's full contents.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoreSnapshot {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub sync_log: Vec<SyncLogEntry>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: RecordCollection::new(),
            devices: RecordCollection::new(),
            positions: RecordCollection::new(),
            sync_log: RwLock::new(Vec::new()),
            session_writes: Mutex::new(()),
        }
    }

    pub(crate) fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        for s in snapshot.sessions {
            store.sessions.upsert(s.id.to_string(), s);
        }
        for d in snapshot.devices {
            store.devices.upsert(d.device_id.clone(), d);
        }
        for p in snapshot.positions {
            store.positions.upsert(p.device_id.clone(), p);
        }
        *store.sync_log.write().expect("sync log lock poisoned") = snapshot.sync_log;
        store
    }

    pub(crate) fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            sessions: self.sessions.values(),
            devices: self.devices.values(),
            positions: self.positions.values(),
            sync_log: self.sync_log.read().expect("sync log lock poisoned").clone(),
        }
    }

    // ── Synchronous core, shared with `JsonFileStore` ────────────────

    pub(crate) fn activate_session_now(&self, session: &Session) {
        let _guard = self.session_writes.lock().expect("session lock poisoned");
        for other in self.sessions.values() {
            if other.user_id == session.user_id && other.is_active && other.id != session.id {
                self.sessions
                    .update(&other.id.to_string(), |s| s.is_active = false);
            }
        }
        let mut active = session.clone();
        active.is_active = true;
        self.sessions.upsert(session.id.to_string(), active);
    }

    fn active_session_now(&self, user_id: &str) -> Option<Session> {
        self.sessions
            .values()
            .into_iter()
            .filter(|s| s.user_id == user_id && s.is_active)
            .max_by_key(|s| s.created_at)
    }

    pub(crate) fn deactivate_session_now(&self, id: Uuid) -> Result<(), StoreError> {
        let _guard = self.session_writes.lock().expect("session lock poisoned");
        if self.sessions.update(&id.to_string(), |s| s.is_active = false) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "session",
                key: id.to_string(),
            })
        }
    }

    pub(crate) fn upsert_device_now(&self, device: &Device) {
        self.devices.upsert(device.device_id.clone(), device.clone());
    }

    pub(crate) fn upsert_position_now(&self, position: &Position) -> PositionWrite {
        let mut stored_at = None;
        let outcome = self.positions.upsert_if(
            position.device_id.clone(),
            position.clone(),
            |stored| {
                stored_at = Some(stored.timestamp);
                position.timestamp >= stored.timestamp
            },
        );
        match (outcome, stored_at) {
            (Upsert::Inserted, _) => PositionWrite::Inserted,
            (Upsert::Kept, Some(stored)) => PositionWrite::Rejected { stored },
            _ => PositionWrite::Updated,
        }
    }

    pub(crate) fn append_sync_log_now(&self, entry: &SyncLogEntry) {
        self.sync_log
            .write()
            .expect("sync log lock poisoned")
            .push(entry.clone());
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn activate_session(&self, session: &Session) -> Result<(), StoreError> {
        self.activate_session_now(session);
        Ok(())
    }

    async fn active_session(&self, user_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.active_session_now(user_id))
    }

    async fn deactivate_session(&self, id: Uuid) -> Result<(), StoreError> {
        self.deactivate_session_now(id)
    }

    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError> {
        self.upsert_device_now(device);
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, StoreError> {
        Ok(self.devices.values())
    }

    async fn device_count(&self) -> Result<usize, StoreError> {
        Ok(self.devices.len())
    }

    async fn upsert_position(&self, position: &Position) -> Result<PositionWrite, StoreError> {
        Ok(self.upsert_position_now(position))
    }

    async fn positions(&self, device_ids: &[String]) -> Result<Vec<Position>, StoreError> {
        Ok(device_ids
            .iter()
            .filter_map(|id| self.positions.get(id))
            .map(|p| Position::clone(&p))
            .collect())
    }

    async fn append_sync_log(&self, entry: &SyncLogEntry) -> Result<(), StoreError> {
        self.append_sync_log_now(entry);
        Ok(())
    }

    async fn sync_log(&self) -> Result<Vec<SyncLogEntry>, StoreError> {
        Ok(self.sync_log.read().expect("sync log lock poisoned").clone())
    }
}
