//! Poll cycle behaviour with in-memory doubles for the device and the API.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mb360_agent::cursor_store::CursorStore;
use mb360_agent::forwarder::{EventSink, ForwardError};
use mb360_agent::poller::{PollError, Poller};
use mb360_agent::session::{AttendanceSource, SessionError};
use mb360_core::attlog::{AttendanceRecord, EventSubmission};
use mb360_core::cursor::PollCursor;
use mb360_core::event::VerifyMode;

const DEVICE: &str = "192.168.10.23";

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// Serves a shared, mutable attendance log.
#[derive(Clone, Default)]
struct FakeDevice {
    records: Arc<Mutex<Vec<AttendanceRecord>>>,
    offline: Arc<Mutex<bool>>,
}

impl FakeDevice {
    fn push(&self, user: &str, minute: u32) {
        self.records.lock().unwrap().push(record(user, minute));
    }
}

#[async_trait]
impl AttendanceSource for FakeDevice {
    fn device_id(&self) -> &str {
        DEVICE
    }

    async fn fetch_records(&self) -> Result<Vec<AttendanceRecord>, SessionError> {
        if *self.offline.lock().unwrap() {
            return Err(SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "device offline",
            )));
        }
        Ok(self.records.lock().unwrap().clone())
    }
}

/// Records every accepted submission; rejects ids listed in `reject`.
#[derive(Clone, Default)]
struct RecordingSink {
    accepted: Arc<Mutex<Vec<EventSubmission>>>,
    reject: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    fn accepted_ids(&self) -> Vec<String> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.event_id.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn forward(&self, submission: &EventSubmission) -> Result<(), ForwardError> {
        if self.reject.lock().unwrap().contains(&submission.event_id) {
            return Err(ForwardError::HttpStatus(500));
        }
        self.accepted.lock().unwrap().push(submission.clone());
        Ok(())
    }
}

fn record(user: &str, minute: u32) -> AttendanceRecord {
    AttendanceRecord {
        user_id: user.to_string(),
        recorded_at: Utc.with_ymd_and_hms(2024, 1, 15, 8, minute, 0).unwrap(),
        verify_mode: VerifyMode::Face,
        punch: None,
    }
}

fn event_id(user: &str, minute: u32) -> String {
    record(user, minute).event_id(DEVICE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unchanged_log_forwards_nothing_the_second_time() {
    let device = FakeDevice::default();
    device.push("1001", 30);
    device.push("1002", 31);
    let sink = RecordingSink::default();
    let mut poller = Poller::new(device, sink.clone(), PollCursor::new());

    let first = poller.poll_cycle().await.unwrap();
    let second = poller.poll_cycle().await.unwrap();

    assert_eq!(first.forwarded, 2);
    assert_eq!(second.fetched, 2);
    assert_eq!(second.forwarded, 0);
    assert_eq!(sink.accepted_ids().len(), 2);
}

#[tokio::test]
async fn only_new_records_are_forwarded_oldest_first() {
    let device = FakeDevice::default();
    device.push("1001", 30);
    let sink = RecordingSink::default();
    let mut poller = Poller::new(device.clone(), sink.clone(), PollCursor::new());
    poller.poll_cycle().await.unwrap();

    device.push("1003", 45);
    device.push("1002", 40);
    let report = poller.poll_cycle().await.unwrap();

    assert_eq!(report.forwarded, 2);
    assert_eq!(
        sink.accepted_ids(),
        vec![event_id("1001", 30), event_id("1002", 40), event_id("1003", 45)]
    );
    assert_eq!(
        poller.cursor().last_seen,
        Some(Utc.with_ymd_and_hms(2024, 1, 15, 8, 45, 0).unwrap())
    );
}

#[tokio::test]
async fn failed_forward_stops_cycle_and_is_retried() {
    let device = FakeDevice::default();
    device.push("1001", 30);
    device.push("1002", 31);
    device.push("1003", 32);
    let sink = RecordingSink::default();
    sink.reject.lock().unwrap().push(event_id("1002", 31));
    let mut poller = Poller::new(device, sink.clone(), PollCursor::new());

    let err = poller.poll_cycle().await.unwrap_err();
    assert_matches!(err, PollError::Forward { ref event_id, .. } if event_id.ends_with(":1002:1705307460"));
    assert_eq!(sink.accepted_ids(), vec![event_id("1001", 30)]);
    assert_eq!(
        poller.cursor().last_seen,
        Some(Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap())
    );

    sink.reject.lock().unwrap().clear();
    let report = poller.poll_cycle().await.unwrap();
    assert_eq!(report.forwarded, 2);
}

#[tokio::test]
async fn shared_timestamp_group_is_not_split_by_a_failure() {
    let device = FakeDevice::default();
    device.push("1001", 30);
    device.push("1002", 30);
    let sink = RecordingSink::default();
    sink.reject.lock().unwrap().push(event_id("1002", 30));
    let mut poller = Poller::new(device, sink.clone(), PollCursor::new());

    assert!(poller.poll_cycle().await.is_err());
    assert_eq!(poller.cursor(), PollCursor::new());

    sink.reject.lock().unwrap().clear();
    poller.poll_cycle().await.unwrap();
    assert!(sink.accepted_ids().contains(&event_id("1002", 30)));
}

#[tokio::test]
async fn device_failure_is_a_session_error() {
    let device = FakeDevice::default();
    *device.offline.lock().unwrap() = true;
    let mut poller = Poller::new(device, RecordingSink::default(), PollCursor::new());

    assert_matches!(poller.poll_cycle().await, Err(PollError::Session(_)));
    assert_eq!(poller.cursor(), PollCursor::new());
}

#[tokio::test]
async fn cursor_survives_restart_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = CursorStore::new(dir.path().join("cursor.json"));
    let device = FakeDevice::default();
    device.push("1001", 30);

    let first_sink = RecordingSink::default();
    let mut poller = Poller::new(device.clone(), first_sink.clone(), store.load().await.unwrap())
        .with_store(store.clone());
    poller.poll_cycle().await.unwrap();
    assert_eq!(first_sink.accepted_ids().len(), 1);

    // A fresh agent process picks up the persisted cursor.
    let second_sink = RecordingSink::default();
    let mut restarted = Poller::new(device, second_sink.clone(), store.load().await.unwrap())
        .with_store(store);
    let report = restarted.poll_cycle().await.unwrap();

    assert_eq!(report.forwarded, 0);
    assert!(second_sink.accepted_ids().is_empty());
}
