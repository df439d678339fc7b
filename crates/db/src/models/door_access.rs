//! Door sensor rows.

use serde::Serialize;
use sqlx::FromRow;
use mb360_core::event::DoorEvent;
use mb360_core::types::{DbId, Timestamp};

/// A row from the `door_accesses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DoorAccess {
    pub id: DbId,
    pub event_id: String,
    pub user_id: Option<String>,
    pub device_id: String,
    pub action: String,
    pub recorded_at: Timestamp,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateDoorAccess {
    pub event_id: String,
    pub user_id: Option<String>,
    pub device_id: String,
    pub action: &'static str,
    pub recorded_at: Timestamp,
}

impl From<&DoorEvent> for CreateDoorAccess {
    fn from(event: &DoorEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            device_id: event.device_id.clone(),
            action: event.action.as_str(),
            recorded_at: event.timestamp,
        }
    }
}
