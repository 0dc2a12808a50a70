#![allow(clippy::unwrap_used)]
// Command dispatch and its audit trail.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tracklink_core::{
    Device, DispatchError, LogStatus, ManualClock, MemoryStore, OperationType, Position,
    PositionWrite, RecordStore, Session, StoreError, SyncLogEntry, Tracker, TransportError,
};

use common::{COMMAND_SECRET, TOKEN, harness, login, mount_login, ok, t0, test_config};

#[tokio::test]
async fn test_unauthenticated_command_writes_no_log() {
    let h = harness().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.tracker.send_command("D1", "REBOOT", &[]).await.unwrap_err();

    assert!(matches!(err, DispatchError::Unauthenticated));
    assert!(h.tracker.sync_log().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_accepted_command_is_audited() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "sendCommand"))
        .and(query_param("token", TOKEN))
        .and(body_json(json!({
            "deviceId": "D1",
            "command": "REBOOT",
            "params": ["now"],
            "secret": COMMAND_SECRET
        })))
        .respond_with(ok(json!({ "commandId": "C-77", "result": "queued" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let outcome = h
        .tracker
        .send_command("D1", "REBOOT", &["now".to_owned()])
        .await
        .unwrap();

    assert_eq!(outcome.command_id.as_deref(), Some("C-77"));
    assert_eq!(outcome.result, Some(json!("queued")));
    assert_eq!(outcome.sent_at, t0());

    let log = h.tracker.sync_log().await.unwrap();
    assert_eq!(log.len(), 1);
    let entry = &log[0];
    assert_eq!(entry.id, outcome.log_id);
    assert_eq!(entry.operation_type, OperationType::SendCommand);
    assert_eq!(entry.status, LogStatus::Success);
    assert_eq!(
        entry.request_payload,
        json!({ "deviceId": "D1", "command": "REBOOT", "params": ["now"] })
    );
}

#[tokio::test]
async fn test_rejected_command_is_audited() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "sendCommand"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 30001, "cause": "device offline" })),
        )
        .mount(&h.server)
        .await;

    let err = h.tracker.send_command("D1", "REBOOT", &[]).await.unwrap_err();
    assert!(
        matches!(err, DispatchError::Rejected { status: 30001, ref cause } if cause == "device offline")
    );

    let log = h.tracker.sync_log().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, LogStatus::VendorError);
    assert_eq!(log[0].vendor_status_code, Some(30001));
}

#[tokio::test]
async fn test_transport_failure_is_not_retried_and_is_audited() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "sendCommand"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.tracker.send_command("D1", "REBOOT", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Transport(TransportError::HttpStatus { status: 502, .. })
    ));

    let log = h.tracker.sync_log().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, LogStatus::TransportError);
    assert_eq!(log[0].vendor_status_code, None);
}

#[tokio::test]
async fn test_blank_command_is_invalid() {
    let h = harness().await;
    login(&h).await;

    let err = h.tracker.send_command("D1", "  ", &[]).await.unwrap_err();
    assert!(matches!(err, DispatchError::Invalid { .. }));
    assert!(h.tracker.sync_log().await.unwrap().is_empty());
}

// ── Audit write failure ─────────────────────────────────────────────

/// Delegates to a `MemoryStore` but refuses sync log writes.
#[derive(Debug, Default)]
struct NoLogStore {
    inner: MemoryStore,
}

#[async_trait]
impl RecordStore for NoLogStore {
    async fn activate_session(&self, session: &Session) -> Result<(), StoreError> {
        self.inner.activate_session(session).await
    }
    async fn active_session(&self, user_id: &str) -> Result<Option<Session>, StoreError> {
        self.inner.active_session(user_id).await
    }
    async fn deactivate_session(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.deactivate_session(id).await
    }
    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError> {
        self.inner.upsert_device(device).await
    }
    async fn devices(&self) -> Result<Vec<Device>, StoreError> {
        self.inner.devices().await
    }
    async fn device_count(&self) -> Result<usize, StoreError> {
        self.inner.device_count().await
    }
    async fn upsert_position(&self, position: &Position) -> Result<PositionWrite, StoreError> {
        self.inner.upsert_position(position).await
    }
    async fn positions(&self, device_ids: &[String]) -> Result<Vec<Position>, StoreError> {
        self.inner.positions(device_ids).await
    }
    async fn append_sync_log(&self, _entry: &SyncLogEntry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("audit table offline".into()))
    }
    async fn sync_log(&self) -> Result<Vec<SyncLogEntry>, StoreError> {
        self.inner.sync_log().await
    }
}

#[tokio::test]
async fn test_failed_audit_write_fails_the_command() {
    let server = MockServer::start().await;
    let tracker = Tracker::with_clock(
        test_config(&server),
        Arc::new(NoLogStore::default()),
        Arc::new(ManualClock::new(t0())),
    )
    .unwrap();

    mount_login(&server).await;
    tracker
        .authenticate("alice", &SecretString::from("secret"))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(query_param("action", "sendCommand"))
        .respond_with(ok(json!({ "commandId": "C-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let err = tracker.send_command("D1", "REBOOT", &[]).await.unwrap_err();
    assert!(matches!(err, DispatchError::Store(StoreError::Unavailable(_))));
}
