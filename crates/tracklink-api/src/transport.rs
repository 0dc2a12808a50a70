// HTTP client construction for vendor calls.
//
// Certificate handling and timeouts are decided once, here; the vendor
// client only ever sees a ready `reqwest::Client`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Certificate, ClientBuilder};

use crate::error::TransportError;

const USER_AGENT: &str = concat!("tracklink/", env!("CARGO_PKG_VERSION"));

/// Upper bound on TCP/TLS connection setup, independent of the
/// per-attempt timeout.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the vendor's certificate is verified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Platform trust roots.
    #[default]
    System,
    /// Trust an additional PEM-encoded CA.
    CustomCa(PathBuf),
    /// Skip verification (vendor sandboxes with self-signed certs).
    DangerAcceptInvalid,
}

impl TlsMode {
    fn configure(&self, builder: ClientBuilder) -> Result<ClientBuilder, TransportError> {
        Ok(match self {
            Self::System => builder,
            Self::CustomCa(path) => builder.add_root_certificate(load_ca(path)?),
            Self::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        })
    }
}

fn load_ca(path: &Path) -> Result<Certificate, TransportError> {
    let pem = std::fs::read(path).map_err(|e| {
        TransportError::Tls(format!("cannot read CA bundle {}: {e}", path.display()))
    })?;
    Certificate::from_pem(&pem)
        .map_err(|e| TransportError::Tls(format!("CA bundle {} is not PEM: {e}", path.display())))
}

/// Settings every vendor HTTP client is built from.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Per-attempt timeout. Applied both to the `reqwest` client and as a
    /// cancellation deadline around each attempt.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build the `reqwest::Client` used for every vendor call.
    pub fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        let builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .connect_timeout(self.timeout.min(MAX_CONNECT_TIMEOUT));

        self.tls
            .configure(builder)?
            .build()
            .map_err(|e| TransportError::Tls(format!("HTTP client setup failed: {e}")))
    }
}
