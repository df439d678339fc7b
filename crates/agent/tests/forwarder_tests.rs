//! Integration tests for [`HttpForwarder`] against a minimal HTTP stub.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use mb360_agent::forwarder::{EventSink, ForwardError, HttpForwarder};
use mb360_core::attlog::AttendanceRecord;
use mb360_core::event::{PunchState, VerifyMode};

fn submission() -> mb360_core::attlog::EventSubmission {
    AttendanceRecord {
        user_id: "1001".into(),
        recorded_at: Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap(),
        verify_mode: VerifyMode::Card,
        punch: Some(PunchState::CheckIn),
    }
    .to_submission("192.168.10.23")
}

#[tokio::test]
async fn submission_is_posted_as_json() {
    let (addr, api) = common::stub_http("HTTP/1.1 200 OK", "").await;
    let forwarder = HttpForwarder::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();

    forwarder.forward(&submission()).await.unwrap();

    let request = api.await.unwrap();
    assert!(request.starts_with("POST /mb360/events HTTP/1.1"), "{request}");
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["event_id"], "192.168.10.23:1001:1705307400");
    assert_eq!(json["event_type"], "attendance");
    assert_eq!(json["verify_mode"], "card");
    assert_eq!(json["timestamp"], 1_705_307_400);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let (addr, _api) = common::stub_http("HTTP/1.1 400 Bad Request", "").await;
    let forwarder = HttpForwarder::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();

    let err = forwarder.forward(&submission()).await.unwrap_err();

    assert_matches!(err, ForwardError::HttpStatus(400));
}

#[tokio::test]
async fn unreachable_api_is_a_request_error() {
    let addr = common::closed_addr().await;
    let forwarder = HttpForwarder::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();

    let err = forwarder.forward(&submission()).await.unwrap_err();

    assert_matches!(err, ForwardError::Request(_));
}
