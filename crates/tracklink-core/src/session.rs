// ── Session manager ──
//
// Owns one application user's vendor session: credential exchange, expiry
// tracking, restore on restart, and logout. The store is the source of
// truth; the in-memory pointer is a cache of the active row.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tracklink_api::{LoginData, PasswordEncoding, VendorClient};

use crate::clock::Clock;
use crate::config::{TrackerConfig, chrono_duration};
use crate::convert::parse_vendor_time;
use crate::error::{AuthError, StoreError};
use crate::model::{Session, SessionState};
use crate::store::RecordStore;

/// Token and session validity, with a reason for each failing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCheck {
    pub token_valid: bool,
    pub session_valid: bool,
    pub reasons: Vec<String>,
}

/// Authentication lifecycle for a single application user.
#[derive(Debug)]
pub struct SessionManager {
    client: Arc<VendorClient>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    user_id: String,
    password_encoding: PasswordEncoding,
    default_ttl: chrono::Duration,
    current: RwLock<Option<Session>>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(
        client: Arc<VendorClient>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        config: &TrackerConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            client,
            store,
            clock,
            user_id: config.user_id.clone(),
            password_encoding: config.password_encoding,
            default_ttl: chrono_duration(config.session_ttl),
            current: RwLock::new(None),
            state,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Exchange credentials for a new session and persist it as the
    /// user's only active one.
    ///
    /// On any failure the previous session, in memory and in the store,
    /// is left as it was.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidCredentials {
                reason: "username is empty".into(),
            });
        }
        if password.expose_secret().is_empty() {
            return Err(AuthError::InvalidCredentials {
                reason: "password is empty".into(),
            });
        }

        let previous = self.state();
        self.set_state(SessionState::Authenticating);

        match self.login(username, password).await {
            Ok(session) => {
                *self.current.write().expect("session lock poisoned") = Some(session.clone());
                self.set_state(SessionState::Authenticated);
                info!(
                    user_id = %self.user_id,
                    vendor_username = username,
                    expires_at = %session.expires_at,
                    "vendor session established"
                );
                Ok(session)
            }
            Err(e) => {
                self.set_state(previous);
                warn!(user_id = %self.user_id, error = %e, "vendor authentication failed");
                Err(e)
            }
        }
    }

    async fn login(&self, username: &str, password: &SecretString) -> Result<Session, AuthError> {
        let encoded = self.password_encoding.encode(password);
        let resp = self.client.login(username, &encoded).await?;
        if let Some(rejection) = resp.rejection() {
            return Err(rejection.into());
        }

        let data: LoginData = resp.decode()?;
        let token = data
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::MissingToken)?;

        let created_at = self.clock.now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: self.user_id.clone(),
            vendor_username: username.to_owned(),
            token: SecretString::from(token),
            created_at,
            expires_at: self.expiry_for(created_at, data.expires_at.as_deref()),
            is_active: true,
        };

        self.store.activate_session(&session).await?;
        Ok(session)
    }

    /// The vendor's expiry when usable, otherwise `created_at + ttl`.
    fn expiry_for(&self, created_at: DateTime<Utc>, vendor: Option<&str>) -> DateTime<Utc> {
        match vendor.and_then(parse_vendor_time) {
            Some(at) if at > created_at => at,
            Some(at) => {
                debug!(vendor_expiry = %at, "ignoring vendor expiry not after creation");
                created_at + self.default_ttl
            }
            None => created_at + self.default_ttl,
        }
    }

    /// Restore the user's persisted active session.
    ///
    /// An active row that has already expired is deactivated and `None`
    /// is returned.
    pub async fn load_existing_session(&self) -> Result<Option<Session>, StoreError> {
        let Some(session) = self.store.active_session(&self.user_id).await? else {
            debug!(user_id = %self.user_id, "no persisted vendor session");
            return Ok(None);
        };

        let now = self.clock.now();
        if session.is_expired_at(now) {
            info!(
                user_id = %self.user_id,
                expired_at = %session.expires_at,
                "persisted vendor session has expired"
            );
            self.store.deactivate_session(session.id).await?;
            return Ok(None);
        }

        *self.current.write().expect("session lock poisoned") = Some(session.clone());
        self.set_state(SessionState::Authenticated);
        debug!(user_id = %self.user_id, expires_at = %session.expires_at, "restored vendor session");
        Ok(Some(session))
    }

    /// Local expiry check; never contacts the vendor or the store.
    ///
    /// Returns `true` if a valid session is held. An expired session is
    /// dropped from memory; its persisted row is left for audit.
    pub fn refresh_session(&self) -> bool {
        let now = self.clock.now();
        let mut current = self.current.write().expect("session lock poisoned");
        let expired_at = match current.as_ref() {
            Some(s) if s.is_valid_at(now) => return true,
            Some(s) => s.expires_at,
            None => return false,
        };

        *current = None;
        drop(current);
        info!(user_id = %self.user_id, %expired_at, "vendor session expired");
        self.set_state(SessionState::Expired);
        false
    }

    /// End the session. Vendor-side invalidation and the store update are
    /// both best-effort; failures are logged and `logout` always completes.
    pub async fn logout(&self) {
        let held = self.current.write().expect("session lock poisoned").take();
        let session = match held {
            Some(s) => Some(s),
            None => match self.store.active_session(&self.user_id).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "could not read persisted session during logout");
                    None
                }
            },
        };

        if let Some(session) = session {
            match self.client.logout(&session.token).await {
                Ok(resp) => {
                    if let Some(r) = resp.rejection() {
                        warn!(status = r.status, cause = %r.cause, "vendor logout rejected (non-fatal)");
                    }
                }
                Err(e) => warn!(error = %e, "vendor logout failed (non-fatal)"),
            }

            if let Err(e) = self.store.deactivate_session(session.id).await {
                warn!(error = %e, session_id = %session.id, "failed to deactivate persisted session");
            }
        }

        self.set_state(SessionState::LoggedOut);
        info!(user_id = %self.user_id, "logged out");
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The held session, valid or not.
    pub fn current_session(&self) -> Option<Session> {
        self.current.read().expect("session lock poisoned").clone()
    }

    /// The held session if it is active and unexpired right now.
    pub fn valid_session(&self) -> Option<Session> {
        let now = self.clock.now();
        self.current_session().filter(|s| s.is_valid_at(now))
    }

    pub fn current_token(&self) -> Option<SecretString> {
        self.valid_session().map(|s| s.token)
    }

    pub fn is_token_valid(&self) -> bool {
        self.valid_session().is_some()
    }

    /// Evaluate token and session validity without side effects.
    pub fn check(&self) -> SessionCheck {
        let now = self.clock.now();
        let mut reasons = Vec::new();

        let (token_valid, session_valid) = match self.current_session() {
            None => {
                reasons.push("no active vendor session".to_owned());
                (false, false)
            }
            Some(s) => {
                let token_valid = !s.is_expired_at(now) && !s.token.expose_secret().is_empty();
                if !token_valid {
                    reasons.push(format!("vendor token expired at {}", s.expires_at.to_rfc3339()));
                }
                if !s.is_active {
                    reasons.push("vendor session is inactive".to_owned());
                }
                (token_valid, s.is_active)
            }
        };

        SessionCheck {
            token_valid,
            session_valid,
            reasons,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: SessionState) {
        self.state.send_replace(next);
    }
}
