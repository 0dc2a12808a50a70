// ── Vendor session ──

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vendor session owned by one application user.
///
/// The token is redacted in `Debug` output; it is only serialized so the
/// record store can restore the session after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub vendor_username: String,
    #[serde(with = "token_serde")]
    pub token: SecretString,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Session {
    /// Whether the session is active and not yet expired at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.expires_at - now).max(chrono::Duration::zero())
    }
}

/// Authentication lifecycle, published on a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
    LoggedOut,
}

mod token_serde {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(token: &SecretString, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(token.expose_secret())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<SecretString, D::Error> {
        String::deserialize(de).map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use secrecy::ExposeSecret;

    fn session() -> Session {
        let created = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        Session {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            vendor_username: "alice".into(),
            token: SecretString::from("abc"),
            created_at: created,
            expires_at: created + chrono::Duration::hours(24),
            is_active: true,
        }
    }

    #[test]
    fn debug_output_redacts_token() {
        let rendered = format!("{:?}", session());
        assert!(!rendered.contains("\"abc\""));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn token_survives_json_round_trip() {
        let json = serde_json::to_string(&session()).unwrap();
        assert!(json.contains("\"vendorUsername\":\"alice\""));
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token.expose_secret(), "abc");
    }

    #[test]
    fn validity_follows_expiry_and_flag() {
        let mut s = session();
        assert!(s.is_valid_at(s.created_at));
        assert!(!s.is_valid_at(s.expires_at));
        s.is_active = false;
        assert!(!s.is_valid_at(s.created_at));
    }
}
