//! Attendance punch rows.

use serde::Serialize;
use sqlx::FromRow;
use mb360_core::event::AttendanceEvent;
use mb360_core::types::{DbId, Timestamp};

/// A row from the `attendances` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attendance {
    pub id: DbId,
    pub event_id: String,
    pub user_id: String,
    pub device_id: String,
    pub verify_mode: String,
    pub punch_state: Option<String>,
    pub recorded_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for inserting an attendance punch.
#[derive(Debug, Clone)]
pub struct CreateAttendance {
    pub event_id: String,
    pub user_id: String,
    pub device_id: String,
    pub verify_mode: &'static str,
    pub punch_state: Option<&'static str>,
    pub recorded_at: Timestamp,
}

impl From<&AttendanceEvent> for CreateAttendance {
    fn from(event: &AttendanceEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            device_id: event.device_id.clone(),
            verify_mode: event.verify_mode.as_str(),
            punch_state: event.punch.map(|p| p.as_str()),
            recorded_at: event.timestamp,
        }
    }
}
