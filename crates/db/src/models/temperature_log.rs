use serde::Serialize;
use sqlx::FromRow;
use mb360_core::event::TemperatureEvent;
use mb360_core::types::{DbId, Timestamp};

/// A row from the `temperature_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemperatureLog {
    pub id: DbId,
    pub event_id: String,
    pub user_id: Option<String>,
    pub device_id: String,
    pub value: f64,
    pub recorded_at: Timestamp,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateTemperatureLog {
    pub event_id: String,
    pub user_id: Option<String>,
    pub device_id: String,
    pub value: f64,
    pub recorded_at: Timestamp,
}

impl From<&TemperatureEvent> for CreateTemperatureLog {
    fn from(event: &TemperatureEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            device_id: event.device_id.clone(),
            value: event.value,
            recorded_at: event.timestamp,
        }
    }
}
