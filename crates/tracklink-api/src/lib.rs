//! Async client for action-based GPS tracking vendor APIs.
//!
//! The vendor exposes a single endpoint dispatching on an `action` query
//! parameter; authenticated actions carry the session `token` on the query
//! string. Responses are flat JSON objects where `status == 0` means
//! success and a non-zero status comes with a `cause` string.
//!
//! - [`VendorClient`] builds requests, enforces per-attempt timeouts, and
//!   retries transient failures according to a [`BackoffPolicy`].
//! - [`VendorResponse`] is the decoded envelope; payload types live in
//!   [`models`].
//! - [`TransportError`] covers everything below business semantics.

pub mod actions;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod retry;
pub mod transport;

pub use auth::PasswordEncoding;
pub use client::VendorClient;
pub use error::TransportError;
pub use models::{
    CommandReceipt, LastPositionData, LoginData, MonitorDevice, MonitorGroup, MonitorList,
    SUCCESS_STATUS, VendorPosition, VendorRejection, VendorResponse,
};
pub use retry::BackoffPolicy;
pub use transport::{TlsMode, TransportConfig};
