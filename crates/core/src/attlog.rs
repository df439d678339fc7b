//! Parser for the MB360 attendance log text format.
//!
//! The device answers `GET_ATTENDANCE_DATA` (and the `AttLog.cgi` HTTP page)
//! with one record per line:
//!
//! ```text
//! UserID,DateTime,VerifyMode,Status
//! 1001,2024-01-15 08:30:00,1,0
//! ```
//!
//! Lines that do not match are dropped without error; the device mixes
//! status chatter into the same stream.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::event::{EventKind, PunchState, VerifyMode};
use crate::types::Timestamp;

/// Minimum number of comma-separated fields in a valid record line.
pub const MIN_FIELDS: usize = 4;

/// `DateTime` column format. The device clock carries no zone; values are
/// taken as UTC.
pub const DEVICE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One attendance punch read from the device log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub user_id: String,
    pub recorded_at: Timestamp,
    pub verify_mode: VerifyMode,
    pub punch: Option<PunchState>,
}

impl AttendanceRecord {
    /// Stable id for a punch: the log itself carries none, so it is derived
    /// from the device, the user and the punch time.
    pub fn event_id(&self, device_id: &str) -> String {
        format!("{device_id}:{}:{}", self.user_id, self.recorded_at.timestamp())
    }

    /// Build the ingest request body for this record.
    pub fn to_submission(&self, device_id: &str) -> EventSubmission {
        EventSubmission {
            event_id: self.event_id(device_id),
            event_type: EventKind::Attendance,
            user_id: Some(self.user_id.clone()),
            timestamp: self.recorded_at.timestamp(),
            verify_mode: Some(self.verify_mode),
            punch_state: self.punch,
            device_id: Some(device_id.to_string()),
        }
    }
}

/// JSON body accepted by `POST /mb360/events`, as produced by the polling
/// agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSubmission {
    pub event_id: String,
    pub event_type: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_mode: Option<VerifyMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punch_state: Option<PunchState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Parse a full device response into records, skipping malformed lines.
pub fn parse_attendance_log(text: &str) -> Vec<AttendanceRecord> {
    text.lines().filter_map(parse_attendance_line).collect()
}

/// Parse a single record line.
///
/// Returns `None` for blank lines, lines with fewer than [`MIN_FIELDS`]
/// fields, an empty user id, an unparseable date or an unknown verify mode.
/// An unknown status code is kept as `punch: None`.
pub fn parse_attendance_line(line: &str) -> Option<AttendanceRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < MIN_FIELDS {
        return None;
    }

    let user_id = parts[0];
    if user_id.is_empty() {
        return None;
    }

    let recorded_at = NaiveDateTime::parse_from_str(parts[1], DEVICE_DATETIME_FORMAT)
        .ok()?
        .and_utc();
    let verify_mode = VerifyMode::parse(parts[2])?;
    let punch = PunchState::parse(parts[3]);

    Some(AttendanceRecord {
        user_id: user_id.to_string(),
        recorded_at,
        verify_mode,
        punch,
    })
}
