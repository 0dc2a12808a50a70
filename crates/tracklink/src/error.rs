//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use tracklink_config::ConfigError;
use tracklink_core::{AuthError, DispatchError, StoreError, SyncError, TransportError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the tracking vendor")]
    #[diagnostic(
        code(tracklink::connection_failed),
        help(
            "Check vendor_url in your profile and your network connection.\n\
             Try: tracklink health -v"
        )
    )]
    ConnectionFailed {
        #[source]
        source: TransportError,
    },

    #[error("Vendor request timed out")]
    #[diagnostic(
        code(tracklink::timeout),
        help("Increase the per-attempt timeout with --timeout or check vendor responsiveness.")
    )]
    Timeout {
        #[source]
        source: TransportError,
    },

    #[error("Vendor connection is not healthy: {reason}")]
    #[diagnostic(code(tracklink::unhealthy))]
    Unhealthy { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Vendor rejected login (status {status}): {cause}")]
    #[diagnostic(
        code(tracklink::auth_failed),
        help(
            "Verify the account name and password.\n\
             Run: tracklink config set-password --profile {profile}"
        )
    )]
    AuthFailed {
        profile: String,
        status: i64,
        cause: String,
    },

    #[error("Not logged in to the tracking vendor")]
    #[diagnostic(
        code(tracklink::not_authenticated),
        help("Run: tracklink login --profile {profile}")
    )]
    NotAuthenticated { profile: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(tracklink::no_credentials),
        help(
            "Configure credentials with: tracklink config init\n\
             Or set TRACKLINK_USERNAME and TRACKLINK_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Vendor ───────────────────────────────────────────────────────
    #[error("Vendor error (status {status}): {cause}")]
    #[diagnostic(code(tracklink::vendor_error))]
    Vendor { status: i64, cause: String },

    #[error("Vendor rejected command (status {status}): {cause}")]
    #[diagnostic(
        code(tracklink::command_rejected),
        help("The attempt was recorded. Run: tracklink log --failures")
    )]
    CommandRejected { status: i64, cause: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tracklink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(tracklink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: tracklink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(tracklink::no_config),
        help(
            "Create one with: tracklink config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(tracklink::config))]
    Config(ConfigError),

    // ── Local state ──────────────────────────────────────────────────
    #[error("Record store error")]
    #[diagnostic(
        code(tracklink::store),
        help("Check permissions on the store file, or point store_path elsewhere.")
    )]
    Store(#[from] StoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unhealthy { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotAuthenticated { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::ProfileNotFound { .. } | Self::NoConfig { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to errors that name it in their help.
    pub fn for_profile(self, profile: &str) -> Self {
        match self {
            Self::NotAuthenticated { .. } => Self::NotAuthenticated {
                profile: profile.into(),
            },
            Self::AuthFailed { status, cause, .. } => Self::AuthFailed {
                profile: profile.into(),
                status,
                cause,
            },
            other => other,
        }
    }
}

// ── Core errors → CliError ───────────────────────────────────────────

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        if err.is_timeout() {
            Self::Timeout { source: err }
        } else {
            Self::ConnectionFailed { source: err }
        }
    }
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials { reason } => Self::Validation {
                field: "credentials".into(),
                reason,
            },
            AuthError::Rejected { status, cause } => Self::AuthFailed {
                profile: "current".into(),
                status,
                cause,
            },
            AuthError::MissingToken => Self::Vendor {
                status: 0,
                cause: "login succeeded but no token was returned".into(),
            },
            AuthError::Transport(e) => e.into(),
            AuthError::Store(e) => Self::Store(e),
        }
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Unauthenticated => Self::NotAuthenticated {
                profile: "current".into(),
            },
            SyncError::Vendor { status, cause } => Self::Vendor { status, cause },
            SyncError::Transport(e) => e.into(),
            SyncError::Store(e) => Self::Store(e),
        }
    }
}

impl From<DispatchError> for CliError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Unauthenticated => Self::NotAuthenticated {
                profile: "current".into(),
            },
            DispatchError::Invalid { reason } => Self::Validation {
                field: "command".into(),
                reason,
            },
            DispatchError::Rejected { status, cause } => Self::CommandRejected { status, cause },
            DispatchError::Transport(e) => e.into(),
            DispatchError::Store(e) => Self::Store(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::UnknownProfile { profile } => Self::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other),
        }
    }
}
