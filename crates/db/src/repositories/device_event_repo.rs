//! Kind-dispatching insert for validated device events.

use sqlx::PgPool;
use mb360_core::event::DeviceEvent;

use crate::models::attendance::CreateAttendance;
use crate::models::door_access::CreateDoorAccess;
use crate::models::temperature_log::CreateTemperatureLog;
use crate::models::StoredEvent;
use crate::repositories::{AttendanceRepo, DoorAccessRepo, TemperatureLogRepo};

/// Routes each [`DeviceEvent`] variant to the repository of its table.
pub struct DeviceEventRepo;

impl DeviceEventRepo {
    pub async fn insert(pool: &PgPool, event: &DeviceEvent) -> Result<StoredEvent, sqlx::Error> {
        let stored = match event {
            DeviceEvent::Attendance(e) => {
                StoredEvent::Attendance(AttendanceRepo::create(pool, &CreateAttendance::from(e)).await?)
            }
            DeviceEvent::Door(e) => {
                StoredEvent::Door(DoorAccessRepo::create(pool, &CreateDoorAccess::from(e)).await?)
            }
            DeviceEvent::Temperature(e) => StoredEvent::Temperature(
                TemperatureLogRepo::create(pool, &CreateTemperatureLog::from(e)).await?,
            ),
        };

        tracing::debug!(
            id = stored.id(),
            event_type = %stored.kind(),
            event_id = %event.event_id(),
            "Device event stored"
        );
        Ok(stored)
    }
}
