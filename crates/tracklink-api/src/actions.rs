// Vendor action helpers
//
// Payload builders for the actions the integration layer uses. Each
// returns the undecoded `VendorResponse`; callers check `rejection()`
// and `decode()` the payload type from `models`.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::VendorClient;
use crate::error::TransportError;
use crate::models::VendorResponse;

/// Action names on the vendor endpoint.
pub mod action {
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const MONITOR_LIST: &str = "getMonitorList";
    pub const LAST_POSITION: &str = "getLastPosition";
    pub const SEND_COMMAND: &str = "sendCommand";
}

impl VendorClient {
    /// Exchange credentials for a session token.
    ///
    /// `encoded_password` must already be encoded per the vendor contract
    /// (see [`PasswordEncoding`](crate::PasswordEncoding)).
    pub async fn login(
        &self,
        username: &str,
        encoded_password: &SecretString,
    ) -> Result<VendorResponse, TransportError> {
        debug!(username, "logging in");
        let body = json!({
            "username": username,
            "password": encoded_password.expose_secret(),
        });
        self.send(action::LOGIN, &body, None).await
    }

    /// Invalidate a token on the vendor side.
    pub async fn logout(&self, token: &SecretString) -> Result<VendorResponse, TransportError> {
        debug!("logging out");
        self.send(action::LOGOUT, &json!({}), Some(token)).await
    }

    /// List all devices visible to the account, grouped.
    pub async fn monitor_list(
        &self,
        token: &SecretString,
    ) -> Result<VendorResponse, TransportError> {
        debug!("listing monitored devices");
        self.send(action::MONITOR_LIST, &json!({}), Some(token))
            .await
    }

    /// Last known positions, optionally limited to some devices and to
    /// changes since a previous `lastQueryTime` cursor.
    pub async fn last_positions(
        &self,
        token: &SecretString,
        device_ids: Option<&[String]>,
        last_query_time: Option<&str>,
    ) -> Result<VendorResponse, TransportError> {
        debug!(
            devices = device_ids.map_or(0, <[String]>::len),
            incremental = last_query_time.is_some(),
            "fetching last positions"
        );
        let body = last_position_payload(device_ids, last_query_time);
        self.send(action::LAST_POSITION, &body, Some(token)).await
    }

    /// Dispatch a device command. Sent once: commands are not retried.
    pub async fn send_command(
        &self,
        token: &SecretString,
        device_id: &str,
        command: &str,
        params: &[String],
        secret: &SecretString,
    ) -> Result<VendorResponse, TransportError> {
        debug!(device_id, command, "sending device command");
        let body = command_payload(device_id, command, params, secret);
        self.send_once(action::SEND_COMMAND, &body, Some(token))
            .await
    }
}

/// Request body for `getLastPosition`.
pub fn last_position_payload(device_ids: Option<&[String]>, last_query_time: Option<&str>) -> Value {
    let mut body = json!({});
    if let Some(ids) = device_ids {
        body["deviceIds"] = json!(ids);
    }
    if let Some(cursor) = last_query_time {
        body["lastQueryTime"] = json!(cursor);
    }
    body
}

/// Request body for `sendCommand`. Includes the channel secret.
pub fn command_payload(
    device_id: &str,
    command: &str,
    params: &[String],
    secret: &SecretString,
) -> Value {
    json!({
        "deviceId": device_id,
        "command": command,
        "params": params,
        "secret": secret.expose_secret(),
    })
}
