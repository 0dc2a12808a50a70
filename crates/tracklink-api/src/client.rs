// Vendor HTTP client
//
// Wraps `reqwest::Client` with action-based URL construction, token
// injection, per-attempt timeouts, and retry with linear backoff. The
// typed action helpers live in `actions.rs` as inherent methods so this
// module stays focused on transport mechanics.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::TransportError;
use crate::models::VendorResponse;
use crate::retry::BackoffPolicy;
use crate::transport::TransportConfig;

/// Raw HTTP client for an action-based tracking vendor API.
///
/// Every call is `POST {base_url}?action=<action>[&token=<token>]` with a
/// JSON body. The client decodes the `{status, cause, ...}` envelope but
/// never interprets `status` -- that is the caller's business. It is
/// stateless apart from its configuration and safe to share.
#[derive(Debug, Clone)]
pub struct VendorClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    backoff: BackoffPolicy,
}

impl VendorClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(
        base_url: Url,
        transport: &TransportConfig,
        backoff: BackoffPolicy,
    ) -> Result<Self, TransportError> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
            backoff,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        timeout: Duration,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            http,
            base_url,
            timeout,
            backoff,
        }
    }

    /// The vendor endpoint.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The retry policy applied by [`send`](Self::send).
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Build the URL for an action, attaching the token when present.
    pub fn action_url(&self, action: &str, token: Option<&SecretString>) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            if let Some(token) = token {
                query.append_pair("token", token.expose_secret());
            }
        }
        url
    }

    // ── Request execution ────────────────────────────────────────────

    /// Execute an action, retrying transient failures per the backoff policy.
    ///
    /// Exhausting the policy yields [`TransportError::RetriesExhausted`];
    /// non-transient failures (4xx, malformed body) surface immediately.
    pub async fn send(
        &self,
        action: &str,
        payload: &Value,
        token: Option<&SecretString>,
    ) -> Result<VendorResponse, TransportError> {
        self.execute(action, payload, token, &self.backoff).await
    }

    /// Execute an action exactly once, without retries.
    ///
    /// Used for non-idempotent actions where a duplicate would be worse
    /// than a visible failure.
    pub async fn send_once(
        &self,
        action: &str,
        payload: &Value,
        token: Option<&SecretString>,
    ) -> Result<VendorResponse, TransportError> {
        self.execute(action, payload, token, &BackoffPolicy::single())
            .await
    }

    async fn execute(
        &self,
        action: &str,
        payload: &Value,
        token: Option<&SecretString>,
        policy: &BackoffPolicy,
    ) -> Result<VendorResponse, TransportError> {
        let mut attempt: u32 = 1;
        loop {
            match self.attempt(action, payload, token).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_transient() && policy.allows_retry_after(attempt) => {
                    let delay = policy.delay_after(attempt);
                    warn!(
                        action,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "vendor call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() && policy.max_attempts > 1 => {
                    return Err(TransportError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A single attempt, bounded by the per-call timeout.
    async fn attempt(
        &self,
        action: &str,
        payload: &Value,
        token: Option<&SecretString>,
    ) -> Result<VendorResponse, TransportError> {
        let url = self.action_url(action, token);
        debug!(action, authenticated = token.is_some(), "POST vendor action");

        let request = self.http.post(url).json(payload).send();
        let resp = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| TransportError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(TransportError::from)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body: preview,
            });
        }

        let body = resp.text().await.map_err(TransportError::from)?;
        trace!(action, bytes = body.len(), "vendor response received");
        VendorResponse::parse(&body)
    }
}
