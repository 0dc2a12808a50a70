use thiserror::Error;

/// Transport-level failure talking to the tracking vendor.
///
/// Covers everything below business semantics: connection failures,
/// timeouts, non-2xx HTTP responses, and bodies that do not follow the
/// `{status, cause, ...}` convention. A vendor-reported business error
/// (`status != 0`) is *not* a transport error -- it arrives as a normal
/// [`VendorResponse`](crate::VendorResponse) and is interpreted by callers.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, DNS lookup failure and other `reqwest` errors.
    ///
    /// Built through `From`, which drops the request URL: it carries the
    /// session token in its query.
    #[error("vendor request failed: {0}")]
    Http(reqwest::Error),

    /// The configured action endpoint is not a URL.
    #[error("bad vendor URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A single attempt exceeded the per-call timeout.
    #[error("no vendor response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// CA bundle or client setup problem.
    #[error("TLS setup: {0}")]
    Tls(String),

    /// The vendor answered with a non-success HTTP status.
    #[error("Vendor returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body was not a vendor envelope, or a payload failed to decode.
    #[error("unreadable vendor response: {message}")]
    Deserialization { message: String, body: String },

    /// Every attempt allowed by the backoff policy failed.
    #[error("Vendor unreachable after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<TransportError>,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

impl TransportError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if the failure (or the last retried failure) was a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            Self::RetriesExhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    /// HTTP status code, if the vendor produced one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::RetriesExhausted { last, .. } => last.http_status(),
            _ => None,
        }
    }
}
