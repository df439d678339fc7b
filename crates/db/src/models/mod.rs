pub mod attendance;
pub mod door_access;
pub mod temperature_log;

use serde::Serialize;
use mb360_core::event::EventKind;
use mb360_core::types::DbId;

use attendance::Attendance;
use door_access::DoorAccess;
use temperature_log::TemperatureLog;

/// A persisted device event, whichever table it landed in.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum StoredEvent {
    Attendance(Attendance),
    Door(DoorAccess),
    Temperature(TemperatureLog),
}

impl StoredEvent {
    pub fn id(&self) -> DbId {
        match self {
            StoredEvent::Attendance(row) => row.id,
            StoredEvent::Door(row) => row.id,
            StoredEvent::Temperature(row) => row.id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            StoredEvent::Attendance(_) => EventKind::Attendance,
            StoredEvent::Door(_) => EventKind::Door,
            StoredEvent::Temperature(_) => EventKind::Temperature,
        }
    }
}
