// ── Record store ──
//
// Durable storage for sessions, devices, positions and the sync log.
// The core consumes it through `RecordStore`; hosts pick an
// implementation (`MemoryStore` for tests and embedding, `JsonFileStore`
// for the CLI).

mod collection;
mod file;
mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Device, Position, Session, SyncLogEntry};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Result of a guarded position upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionWrite {
    /// First position for the device.
    Inserted,
    /// Replaced a stored position with an equal or newer timestamp.
    Updated,
    /// Older than the stored position; the store is unchanged.
    Rejected { stored: DateTime<Utc> },
}

impl PositionWrite {
    pub fn is_accepted(self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// Upsert-by-key persistence consumed by the core.
///
/// Every write is all-or-nothing per record. Implementations must apply
/// the position stale-write guard atomically with the write.
#[async_trait]
pub trait RecordStore: Debug + Send + Sync {
    /// Persist `session` as the user's only active session, deactivating
    /// any other active session for the same `user_id` in the same step.
    async fn activate_session(&self, session: &Session) -> Result<(), StoreError>;

    /// The user's active session, if any (expired or not).
    async fn active_session(&self, user_id: &str) -> Result<Option<Session>, StoreError>;

    /// Flip `is_active` off. The row is kept for audit.
    async fn deactivate_session(&self, id: Uuid) -> Result<(), StoreError>;

    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError>;

    /// Upsert a synced device list. Durable stores override this to
    /// persist the whole batch in one write.
    async fn upsert_devices(&self, devices: &[Device]) -> Result<(), StoreError> {
        for device in devices {
            self.upsert_device(device).await?;
        }
        Ok(())
    }

    /// All stored devices, ordered by `device_id`.
    async fn devices(&self) -> Result<Vec<Device>, StoreError>;

    async fn device_count(&self) -> Result<usize, StoreError>;

    /// Store `position` unless it is older than the stored one.
    async fn upsert_position(&self, position: &Position) -> Result<PositionWrite, StoreError>;

    /// Guarded upsert of a batch, one outcome per input in order.
    async fn upsert_positions(
        &self,
        positions: &[Position],
    ) -> Result<Vec<PositionWrite>, StoreError> {
        let mut outcomes = Vec::with_capacity(positions.len());
        for position in positions {
            outcomes.push(self.upsert_position(position).await?);
        }
        Ok(outcomes)
    }

    /// Stored positions for `device_ids`, in request order. Devices without
    /// a stored position are skipped.
    async fn positions(&self, device_ids: &[String]) -> Result<Vec<Position>, StoreError>;

    async fn append_sync_log(&self, entry: &SyncLogEntry) -> Result<(), StoreError>;

    /// The audit trail, oldest first.
    async fn sync_log(&self) -> Result<Vec<SyncLogEntry>, StoreError>;
}
