// ── Core error types ──
//
// One error enum per public operation family. Vendor transport failures
// arrive as `tracklink_api::TransportError` and are wrapped, never
// flattened into strings, so callers can still ask `is_timeout()`.
// Vendor business failures carry the verbatim `status` and `cause`.

use thiserror::Error;
use tracklink_api::{TransportError, VendorRejection};

/// Persistence failure in the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record store data is corrupt: {0}")]
    Corrupt(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Authentication failure. Never retried automatically.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    #[error("Vendor rejected login (status {status}): {cause}")]
    Rejected { status: i64, cause: String },

    #[error("Vendor login succeeded but returned no token")]
    MissingToken,

    #[error("Vendor unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to persist session: {0}")]
    Store(#[from] StoreError),
}

/// Device or position synchronisation failure.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No valid vendor session -- authenticate first")]
    Unauthenticated,

    #[error("Vendor error (status {status}): {cause}")]
    Vendor { status: i64, cause: String },

    #[error("Vendor unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

/// Command dispatch failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No valid vendor session -- authenticate first")]
    Unauthenticated,

    #[error("Invalid command: {reason}")]
    Invalid { reason: String },

    #[error("Vendor rejected command (status {status}): {cause}")]
    Rejected { status: i64, cause: String },

    #[error("Vendor unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to write command audit entry: {0}")]
    Store(#[from] StoreError),
}

// ── Conversions from vendor rejections ───────────────────────────────

impl From<VendorRejection> for AuthError {
    fn from(r: VendorRejection) -> Self {
        Self::Rejected {
            status: r.status,
            cause: r.cause,
        }
    }
}

impl From<VendorRejection> for SyncError {
    fn from(r: VendorRejection) -> Self {
        Self::Vendor {
            status: r.status,
            cause: r.cause,
        }
    }
}

impl From<VendorRejection> for DispatchError {
    fn from(r: VendorRejection) -> Self {
        Self::Rejected {
            status: r.status,
            cause: r.cause,
        }
    }
}
