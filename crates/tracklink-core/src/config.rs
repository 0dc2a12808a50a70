// ── Runtime tracker configuration ──
//
// These types describe *how* to talk to the tracking vendor. They carry
// secrets and tuning, but never touch disk. The CLI (or any other host)
// constructs a `TrackerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use tracklink_api::{BackoffPolicy, PasswordEncoding, TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (vendor sandboxes with self-signed certs).
    DangerAcceptInvalid,
}

/// Retry tuning for vendor calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::ZERO,
        }
    }
}

/// Configuration for one application user's vendor integration.
///
/// Built by the host application and passed to [`Tracker`](crate::Tracker).
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Vendor action endpoint (e.g. `https://api.tracker.example/open/api`).
    pub vendor_url: Url,
    /// Application user that owns the vendor session.
    pub user_id: String,
    pub tls: TlsVerification,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    pub retry: RetrySettings,
    pub password_encoding: PasswordEncoding,
    /// Shared secret the vendor requires on the command channel.
    pub command_secret: SecretString,
    /// Session lifetime used when the vendor does not report an expiry.
    pub session_ttl: Duration,
    /// How long a computed health status is served from cache.
    pub health_ttl: Duration,
    /// A device counts as online if it was active within this window.
    pub online_window: Duration,
}

pub const DEFAULT_VENDOR_URL: &str = "https://api.tracker.example/open/api";

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            vendor_url: DEFAULT_VENDOR_URL
                .parse()
                .expect("default vendor URL is valid"),
            user_id: "default".into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            retry: RetrySettings::default(),
            password_encoding: PasswordEncoding::default(),
            command_secret: SecretString::from(String::new()),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            health_ttl: Duration::from_secs(30),
            online_window: Duration::from_secs(10 * 60),
        }
    }
}

impl TrackerConfig {
    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }

    pub(crate) fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::linear(self.retry.max_attempts, self.retry.base_delay)
            .with_jitter(self.retry.max_jitter)
    }
}

/// Convert a std duration to a chrono one, saturating on overflow.
pub(crate) fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}
