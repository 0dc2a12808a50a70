#![allow(clippy::unwrap_used)]
// Device and position sync against a mock vendor.

mod common;

use std::time::Duration as StdDuration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, query_param};
use wiremock::{Mock, ResponseTemplate};

use std::sync::Arc;
use std::sync::atomic::Ordering;

use secrecy::SecretString;

use tracklink_core::{
    LogStatus, OperationType, PositionQuery, RecordStore, StoreError, SyncError, Tracker,
    TransportError,
};

use common::{
    TOKEN, flaky_harness, harness, harness_with, login, monitor_list_body, mount_login, ok,
    raw_position,
};

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| (*s).to_owned()).collect()
}

// ── fetch_devices ───────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_devices_requires_session() {
    let h = harness().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.tracker.fetch_devices().await.unwrap_err();
    assert!(matches!(err, SyncError::Unauthenticated));
}

#[tokio::test]
async fn test_fetch_devices_flattens_groups() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getMonitorList"))
        .and(query_param("token", TOKEN))
        .respond_with(ok(monitor_list_body()))
        .expect(1)
        .mount(&h.server)
        .await;

    let devices = h.tracker.fetch_devices().await.unwrap();

    let summary: Vec<(&str, Option<&str>, bool)> = devices
        .iter()
        .map(|d| (d.device_id.as_str(), d.group_name.as_deref(), d.is_online))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("D1", Some("Vans"), true),
            ("D2", Some("Vans"), false),
            ("D3", Some("Trucks"), true),
        ]
    );
    assert_eq!(devices[0].sim_number.as_deref(), Some("4477001"));
    assert_eq!(h.store.device_count().await.unwrap(), 3);

    let log = h.tracker.sync_log().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation_type, OperationType::FetchDevices);
    assert_eq!(log[0].status, LogStatus::Success);
}

#[tokio::test]
async fn test_fetch_devices_is_idempotent() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getMonitorList"))
        .respond_with(ok(monitor_list_body()))
        .expect(2)
        .mount(&h.server)
        .await;

    h.tracker.fetch_devices().await.unwrap();
    let once = h.tracker.stored_devices().await.unwrap();

    h.tracker.fetch_devices().await.unwrap();
    let twice = h.tracker.stored_devices().await.unwrap();

    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_vendor_error_is_typed_and_logged() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getMonitorList"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 20001, "cause": "token invalid" })),
        )
        .mount(&h.server)
        .await;

    let err = h.tracker.fetch_devices().await.unwrap_err();
    assert!(
        matches!(err, SyncError::Vendor { status: 20001, ref cause } if cause == "token invalid"),
        "got: {err:?}"
    );

    let log = h.tracker.sync_log().await.unwrap();
    assert_eq!(log[0].status, LogStatus::VendorError);
    assert_eq!(log[0].vendor_status_code, Some(20001));
}

// ── fetch_positions ─────────────────────────────────────────────────

#[tokio::test]
async fn test_stale_position_is_not_stored() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ok(json!({
            "positions": [raw_position("D1", "2024-12-30 23:50:00", 51.5)]
        })))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ok(json!({
            "positions": [raw_position("D1", "2024-12-30 23:40:00", 48.8)]
        })))
        .mount(&h.server)
        .await;

    let query = PositionQuery::devices(["D1"]);
    let first = h.tracker.fetch_positions(&query).await.unwrap();
    assert_eq!(first.len(), 1);

    let second = h.tracker.fetch_positions(&query).await.unwrap();
    assert!(second.is_empty(), "stale position was accepted");

    let stored = h.store.positions(&ids(&["D1"])).await.unwrap();
    assert_eq!(stored, first);
}

#[tokio::test]
async fn test_position_normalization() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ok(json!({
            "positions": [
                { "deviceId": "D1", "latitude": "51.5", "longitude": "-0.12",
                  "gpsTime": "2024-12-30T23:59:00Z", "vendorExtra": "kept" },
                { "deviceId": "D2", "lat": 1.0 }
            ]
        })))
        .mount(&h.server)
        .await;

    let accepted = h.tracker.fetch_positions(&PositionQuery::all()).await.unwrap();

    assert_eq!(accepted.len(), 1, "malformed position should be skipped");
    let p = &accepted[0];
    assert_eq!(p.speed, 0.0);
    assert_eq!(p.course, 0.0);
    assert_eq!(p.altitude, 0.0);
    assert!(!p.is_moving);
    assert_eq!(p.raw["vendorExtra"], "kept");
    assert_eq!(
        p.timestamp,
        Utc.with_ymd_and_hms(2024, 12, 30, 23, 59, 0).unwrap()
    );
}

#[tokio::test]
async fn test_incremental_fetch_sends_stored_cursor() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .and(body_json(json!({ "deviceIds": ["D1"] })))
        .respond_with(ok(json!({
            "lastQueryTime": 1_735_602_000,
            "positions": [raw_position("D1", "2024-12-30 23:50:00", 51.5)]
        })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .and(body_json(json!({ "deviceIds": ["D1"], "lastQueryTime": "1735602000" })))
        .respond_with(ok(json!({ "lastQueryTime": 1_735_602_060, "positions": [] })))
        .expect(1)
        .mount(&h.server)
        .await;

    let query = PositionQuery::devices(["D1"]).incremental();
    assert_eq!(h.tracker.fetch_positions(&query).await.unwrap().len(), 1);
    assert!(h.tracker.fetch_positions(&query).await.unwrap().is_empty());
}

// ── get_multiple_devices_last_positions ─────────────────────────────

#[tokio::test]
async fn test_timeout_falls_back_to_stored_position() {
    let h = harness_with(|c| c.timeout = StdDuration::from_millis(100)).await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ok(json!({
            "positions": [raw_position("D1", "2024-12-30 23:50:00", 51.5)]
        })))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ok(json!({ "positions": [] })).set_delay(StdDuration::from_secs(2)))
        .expect(3)
        .mount(&h.server)
        .await;

    let live = h
        .tracker
        .get_multiple_devices_last_positions(&ids(&["D1"]))
        .await
        .unwrap();
    let stored_d1 = live["D1"].clone();

    let fallback = h
        .tracker
        .get_multiple_devices_last_positions(&ids(&["D1"]))
        .await
        .unwrap();

    assert_eq!(fallback.len(), 1);
    assert_eq!(fallback["D1"], stored_d1);

    let log = h.tracker.sync_log().await.unwrap();
    let last = log.last().unwrap();
    assert_eq!(last.operation_type, OperationType::FetchPositions);
    assert_eq!(last.status, LogStatus::TransportError);
}

#[tokio::test]
async fn test_timeout_with_nothing_stored_yields_empty_map() {
    let h = harness_with(|c| c.timeout = StdDuration::from_millis(100)).await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ok(json!({ "positions": [] })).set_delay(StdDuration::from_secs(2)))
        .expect(3)
        .mount(&h.server)
        .await;

    let result = h
        .tracker
        .get_multiple_devices_last_positions(&ids(&["D1"]))
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_direct_fetch_surfaces_exhausted_retries() {
    let h = harness_with(|c| c.timeout = StdDuration::from_millis(100)).await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ok(json!({ "positions": [] })).set_delay(StdDuration::from_secs(2)))
        .mount(&h.server)
        .await;

    let err = h
        .tracker
        .fetch_positions(&PositionQuery::devices(["D1"]))
        .await
        .unwrap_err();
    assert!(
        matches!(
            &err,
            SyncError::Transport(t) if matches!(t, TransportError::RetriesExhausted { .. }) && t.is_timeout()
        ),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_multi_device_read_keeps_request_order_and_omits_unknown() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ok(json!({
            "positions": [
                raw_position("D1", "2024-12-30 23:50:00", 1.0),
                raw_position("D3", "2024-12-30 23:51:00", 3.0)
            ]
        })))
        .mount(&h.server)
        .await;

    let map = h
        .tracker
        .get_multiple_devices_last_positions(&ids(&["D3", "D2", "D1"]))
        .await
        .unwrap();

    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["D3", "D1"]);
}

#[tokio::test]
async fn test_unauthenticated_read_answers_from_store() {
    let h = harness().await;

    let map = h
        .tracker
        .get_multiple_devices_last_positions(&ids(&["D1"]))
        .await
        .unwrap();
    assert!(map.is_empty());
}

// ── store failures ──────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_position_write_does_not_advance_cursor() {
    let h = flaky_harness().await;
    mount_login(&h.server).await;
    h.tracker
        .authenticate("alice", &SecretString::from("secret"))
        .await
        .unwrap();

    // Both fetches must go out without a cursor: the first batch was never stored.
    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .and(body_json(json!({ "deviceIds": ["D1"] })))
        .respond_with(ok(json!({
            "lastQueryTime": "C1",
            "positions": [raw_position("D1", "2024-12-30 23:50:00", 51.5)]
        })))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .and(body_json(json!({ "deviceIds": ["D1"], "lastQueryTime": "C1" })))
        .respond_with(ok(json!({ "lastQueryTime": "C2", "positions": [] })))
        .expect(0)
        .mount(&h.server)
        .await;

    h.store.fail_next_position_writes(1);
    let query = PositionQuery::devices(["D1"]).incremental();

    let err = h.tracker.fetch_positions(&query).await.unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Unavailable(_))));
    assert!(h.store.positions(&ids(&["D1"])).await.unwrap().is_empty());

    let accepted = h.tracker.fetch_positions(&query).await.unwrap();
    assert_eq!(accepted.len(), 1);
    assert_eq!(h.store.positions(&ids(&["D1"])).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fallback_read_surfaces_store_error() {
    let h = flaky_harness().await;
    mount_login(&h.server).await;
    h.tracker
        .authenticate("alice", &SecretString::from("secret"))
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(query_param("action", "getLastPosition"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;
    h.store.fail_position_reads.store(true, Ordering::SeqCst);

    let err = h
        .tracker
        .get_multiple_devices_last_positions(&ids(&["D1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Unavailable(_))));
}

// ── token hygiene ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_vendor_errors_do_not_expose_token() {
    const SESSION_TOKEN: &str = "tok-7f3e9a";

    let h = harness().await;
    Mock::given(method("POST"))
        .and(query_param("action", "login"))
        .respond_with(ok(json!({ "token": SESSION_TOKEN })))
        .mount(&h.server)
        .await;
    h.tracker
        .authenticate("alice", &SecretString::from("secret"))
        .await
        .unwrap();

    // Same account and store, but nothing listens on the discard port.
    let mut config = h.tracker.config().clone();
    config.vendor_url = "http://127.0.0.1:9/open/api".parse().unwrap();
    let offline = Tracker::with_clock(
        config,
        Arc::clone(&h.store) as Arc<dyn RecordStore>,
        Arc::clone(&h.clock) as _,
    )
    .unwrap();
    offline.load_existing_session().await.unwrap().unwrap();

    let err = offline.fetch_devices().await.unwrap_err();
    assert!(matches!(err, SyncError::Transport(_)));
    assert!(!err.to_string().contains(SESSION_TOKEN), "{err}");

    let entries = offline.sync_log().await.unwrap();
    assert_eq!(entries.last().unwrap().status, LogStatus::TransportError);
    let log = serde_json::to_string(&entries).unwrap();
    assert!(!log.contains(SESSION_TOKEN), "{log}");

    let health = offline.get_connection_health().await;
    assert!(!health.is_connected);
    let message = health.error_message.unwrap();
    assert!(message.contains("vendor probe failed"), "{message}");
    assert!(!message.contains(SESSION_TOKEN), "{message}");
}
