//! Vendor integration layer for GPS fleet tracking.
//!
//! This crate sits between [`tracklink_api`] (raw vendor HTTP calls) and
//! host applications (the `tracklink` CLI or a web backend), providing:
//!
//! - **[`Tracker`]** -- the main entry point. Wires every component for
//!   one application user and exposes authentication, device and position
//!   sync, connection health, and command dispatch.
//!
//! - **[`SessionManager`]** -- credential exchange, token expiry, restore
//!   on restart, and logout. State changes are published on a `watch`
//!   channel.
//!
//! - **[`SyncService`]** -- device list and position snapshots, written
//!   through to the store. Multi-device position reads fall back to stored
//!   data when the vendor cannot be reached.
//!
//! - **[`HealthMonitor`]** -- cached (30 s by default) health evaluation
//!   with an aggregated, human-readable failure explanation.
//!
//! - **[`CommandDispatcher`]** -- single-attempt device commands with a
//!   mandatory audit entry for every attempt.
//!
//! - **[`RecordStore`]** -- the persistence seam, with [`MemoryStore`] and
//!   [`JsonFileStore`] implementations.

pub mod clock;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod model;
pub mod session;
pub mod store;
pub mod sync;
mod tracker;

// ── Primary re-exports ──────────────────────────────────────────
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RetrySettings, TlsVerification, TrackerConfig};
pub use dispatch::{CommandDispatcher, CommandOutcome};
pub use error::{AuthError, DispatchError, StoreError, SyncError};
pub use health::HealthMonitor;
pub use session::{SessionCheck, SessionManager};
pub use store::{JsonFileStore, MemoryStore, PositionWrite, RecordStore};
pub use sync::{PositionQuery, ProbeSample, SyncService};
pub use tracker::Tracker;

// Model types
pub use model::{
    Device, HealthStatus, LogStatus, OperationType, Position, Session, SessionState, SyncLogEntry,
};

// Vendor-level types consumers need for configuration and error handling
pub use tracklink_api::{PasswordEncoding, TransportError};
