// ── JSON file record store ──
//
// `MemoryStore` contents mirrored to a single JSON document. A write is
// applied to a staged copy of the committed image, the staged image is
// written through a temp file and an atomic rename, and only then does it
// replace the committed one. A failed write leaves memory and disk as they
// were.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::memory::{MemoryStore, StoreSnapshot};
use super::{PositionWrite, RecordStore};
use crate::error::StoreError;
use crate::model::{Device, Position, Session, SyncLogEntry};

/// Durable store for hosts that restart between calls (the CLI).
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Contents known to be on disk. Reads only ever see this image.
    committed: ArcSwap<MemoryStore>,
    /// Held from staging to swap so writes never interleave.
    writer: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => StoreSnapshot::default(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreSnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "opened record store");

        Ok(Self {
            path,
            committed: ArcSwap::from_pointee(MemoryStore::from_snapshot(snapshot)),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> Arc<MemoryStore> {
        self.committed.load_full()
    }

    /// Apply `change` to a staged copy, persist it, then publish it.
    ///
    /// `change` reports whether it modified anything; unchanged stages are
    /// dropped without touching the disk.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&MemoryStore) -> Result<(T, bool), StoreError> + Send,
    ) -> Result<T, StoreError> {
        let _writer = self.writer.lock().await;
        let staged = MemoryStore::from_snapshot(self.current().snapshot());
        let (value, changed) = change(&staged)?;
        if !changed {
            return Ok(value);
        }

        let doc = serde_json::to_vec_pretty(&staged.snapshot())?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &doc))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store writer task failed: {e}")))??;

        self.committed.store(Arc::new(staged));
        Ok(value)
    }
}

fn write_atomically(path: &Path, doc: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(doc)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn activate_session(&self, session: &Session) -> Result<(), StoreError> {
        self.commit(|staged| {
            staged.activate_session_now(session);
            Ok(((), true))
        })
        .await
    }

    async fn active_session(&self, user_id: &str) -> Result<Option<Session>, StoreError> {
        self.current().active_session(user_id).await
    }

    async fn deactivate_session(&self, id: Uuid) -> Result<(), StoreError> {
        self.commit(|staged| staged.deactivate_session_now(id).map(|()| ((), true)))
            .await
    }

    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError> {
        self.upsert_devices(std::slice::from_ref(device)).await
    }

    async fn upsert_devices(&self, devices: &[Device]) -> Result<(), StoreError> {
        self.commit(|staged| {
            for device in devices {
                staged.upsert_device_now(device);
            }
            Ok(((), !devices.is_empty()))
        })
        .await
    }

    async fn devices(&self) -> Result<Vec<Device>, StoreError> {
        self.current().devices().await
    }

    async fn device_count(&self) -> Result<usize, StoreError> {
        self.current().device_count().await
    }

    async fn upsert_position(&self, position: &Position) -> Result<PositionWrite, StoreError> {
        let mut outcomes = self
            .upsert_positions(std::slice::from_ref(position))
            .await?;
        Ok(outcomes.remove(0))
    }

    async fn upsert_positions(
        &self,
        positions: &[Position],
    ) -> Result<Vec<PositionWrite>, StoreError> {
        self.commit(|staged| {
            let outcomes: Vec<PositionWrite> = positions
                .iter()
                .map(|p| staged.upsert_position_now(p))
                .collect();
            let changed = outcomes.iter().any(|o| o.is_accepted());
            Ok((outcomes, changed))
        })
        .await
    }

    async fn positions(&self, device_ids: &[String]) -> Result<Vec<Position>, StoreError> {
        self.current().positions(device_ids).await
    }

    async fn append_sync_log(&self, entry: &SyncLogEntry) -> Result<(), StoreError> {
        self.commit(|staged| {
            staged.append_sync_log_now(entry);
            Ok(((), true))
        })
        .await
    }

    async fn sync_log(&self) -> Result<Vec<SyncLogEntry>, StoreError> {
        self.current().sync_log().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::json;

    use crate::model::{LogStatus, OperationType};

    #[tokio::test]
    async fn contents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let session = Session {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            vendor_username: "alice".into(),
            token: SecretString::from("abc"),
            created_at: now,
            expires_at: now + chrono::Duration::hours(24),
            is_active: true,
        };

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.activate_session(&session).await.unwrap();
            store
                .append_sync_log(&SyncLogEntry::new(
                    OperationType::FetchDevices,
                    json!({}),
                    json!({ "status": 0 }),
                    LogStatus::Success,
                    Some(0),
                    now,
                ))
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        let restored = reopened.active_session("u1").await.unwrap().unwrap();
        assert_eq!(restored.id, session.id);
        assert_eq!(restored.token.expose_secret(), "abc");
        assert_eq!(reopened.sync_log().await.unwrap().len(), 1);
    }

    fn session_at(token: &str, minute: u32) -> Session {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, minute, 0).unwrap();
        Session {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            vendor_username: "alice".into(),
            token: SecretString::from(token),
            created_at: at,
            expires_at: at + chrono::Duration::hours(24),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_and_disk_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let path = state.join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        let first = session_at("first", 0);
        store.activate_session(&first).await.unwrap();

        // A plain file where the directory was makes every write fail.
        let parked = dir.path().join("state.parked");
        std::fs::rename(&state, &parked).unwrap();
        std::fs::write(&state, b"").unwrap();

        let second = session_at("second", 5);
        assert!(matches!(
            store.activate_session(&second).await,
            Err(StoreError::Io(_))
        ));
        let active = store.active_session("u1").await.unwrap().unwrap();
        assert_eq!(active.id, first.id);
        assert!(active.is_active);

        std::fs::remove_file(&state).unwrap();
        std::fs::rename(&parked, &state).unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        let restored = reopened.active_session("u1").await.unwrap().unwrap();
        assert_eq!(restored.id, first.id);
        assert_eq!(restored.token.expose_secret(), "first");
        assert_eq!(reopened.current().snapshot().sessions.len(), 1);
    }

    #[tokio::test]
    async fn stale_batch_skips_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        let at = |m| Utc.with_ymd_and_hms(2025, 1, 1, 8, m, 0).unwrap();
        let position = |m| Position {
            device_id: "D1".into(),
            latitude: 51.5,
            longitude: -0.12,
            speed: 0.0,
            course: 0.0,
            altitude: 0.0,
            timestamp: at(m),
            status_code: None,
            is_moving: false,
            raw: json!({}),
        };

        let outcomes = store
            .upsert_positions(&[position(10), position(12)])
            .await
            .unwrap();
        assert_eq!(outcomes, vec![PositionWrite::Inserted, PositionWrite::Updated]);

        std::fs::remove_file(&path).unwrap();
        let outcomes = store.upsert_positions(&[position(11)]).await.unwrap();
        assert_eq!(outcomes, vec![PositionWrite::Rejected { stored: at(12) }]);
        assert!(!path.exists(), "a fully rejected batch rewrote the store");
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.current().snapshot().sessions.len(), 0);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Corrupt(_))
        ));
    }
}
