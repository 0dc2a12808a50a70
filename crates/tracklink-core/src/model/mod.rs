// ── Domain model ──
//
// Canonical shapes handed to callers. Vendor payloads are normalized into
// these in `convert`; nothing outside this crate sees raw vendor types
// except through `Position::raw`.

pub mod device;
pub mod health;
pub mod position;
pub mod session;
pub mod sync_log;

pub use device::Device;
pub use health::HealthStatus;
pub use position::Position;
pub use session::{Session, SessionState};
pub use sync_log::{LogStatus, OperationType, SyncLogEntry};
