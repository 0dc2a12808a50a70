// ── Command dispatch ──
//
// Sends device-directed commands over the authenticated channel. Each
// command is attempted once and every attempted command leaves an audit
// entry; if the audit write fails the caller hears about it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use tracklink_api::{CommandReceipt, VendorClient};

use crate::clock::Clock;
use crate::error::DispatchError;
use crate::model::{LogStatus, OperationType, SyncLogEntry};
use crate::session::SessionManager;
use crate::store::RecordStore;

/// A command the vendor accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub device_id: String,
    pub command: String,
    pub command_id: Option<String>,
    pub result: Option<Value>,
    /// Id of the audit entry written for this command.
    pub log_id: Uuid,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CommandDispatcher {
    client: Arc<VendorClient>,
    session: Arc<SessionManager>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    secret: SecretString,
}

impl CommandDispatcher {
    pub fn new(
        client: Arc<VendorClient>,
        session: Arc<SessionManager>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        secret: SecretString,
    ) -> Self {
        Self {
            client,
            session,
            store,
            clock,
            secret,
        }
    }

    /// Send `command` to `device_id` once. Not retried, not deduplicated.
    pub async fn send_command(
        &self,
        device_id: &str,
        command: &str,
        params: &[String],
    ) -> Result<CommandOutcome, DispatchError> {
        let token = self
            .session
            .current_token()
            .ok_or(DispatchError::Unauthenticated)?;

        let device_id = device_id.trim();
        let command = command.trim();
        if device_id.is_empty() {
            return Err(DispatchError::Invalid {
                reason: "device id is empty".into(),
            });
        }
        if command.is_empty() {
            return Err(DispatchError::Invalid {
                reason: "command is empty".into(),
            });
        }

        // The channel secret never reaches the audit trail.
        let request = json!({
            "deviceId": device_id,
            "command": command,
            "params": params,
        });
        let sent_at = self.clock.now();

        let resp = self
            .client
            .send_command(&token, device_id, command, params, &self.secret)
            .await;

        let (entry, outcome) = match resp {
            Err(e) => {
                let entry = SyncLogEntry::new(
                    OperationType::SendCommand,
                    request,
                    json!({ "error": e.to_string() }),
                    LogStatus::TransportError,
                    None,
                    sent_at,
                );
                (entry, Err(DispatchError::from(e)))
            }
            Ok(resp) => match resp.rejection() {
                Some(rejection) => {
                    let entry = SyncLogEntry::new(
                        OperationType::SendCommand,
                        request,
                        resp.body.clone(),
                        LogStatus::VendorError,
                        Some(rejection.status),
                        sent_at,
                    );
                    (entry, Err(DispatchError::from(rejection)))
                }
                None => match resp.decode::<CommandReceipt>() {
                    Ok(receipt) => {
                        let entry = SyncLogEntry::new(
                            OperationType::SendCommand,
                            request,
                            resp.body.clone(),
                            LogStatus::Success,
                            Some(resp.status),
                            sent_at,
                        );
                        let outcome = CommandOutcome {
                            device_id: device_id.to_owned(),
                            command: command.to_owned(),
                            command_id: receipt.command_id,
                            result: receipt.result,
                            log_id: entry.id,
                            sent_at,
                        };
                        (entry, Ok(outcome))
                    }
                    Err(e) => {
                        let entry = SyncLogEntry::new(
                            OperationType::SendCommand,
                            request,
                            resp.body.clone(),
                            LogStatus::TransportError,
                            Some(resp.status),
                            sent_at,
                        );
                        (entry, Err(DispatchError::from(e)))
                    }
                },
            },
        };

        self.store.append_sync_log(&entry).await?;

        match &outcome {
            Ok(o) => info!(device_id, command, command_id = ?o.command_id, "command accepted"),
            Err(e) => warn!(device_id, command, error = %e, "command failed"),
        }
        outcome
    }
}
