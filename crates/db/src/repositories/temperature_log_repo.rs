//! Repository for the `temperature_logs` table.

use sqlx::PgPool;

use crate::models::temperature_log::{CreateTemperatureLog, TemperatureLog};

const COLUMNS: &str = "id, event_id, user_id, device_id, value, recorded_at, created_at";

pub struct TemperatureLogRepo;

impl TemperatureLogRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateTemperatureLog,
    ) -> Result<TemperatureLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO temperature_logs (event_id, user_id, device_id, value, recorded_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemperatureLog>(&query)
            .bind(&input.event_id)
            .bind(&input.user_id)
            .bind(&input.device_id)
            .bind(input.value)
            .bind(input.recorded_at)
            .fetch_one(pool)
            .await
    }

    /// List readings for a device, most recent first.
    pub async fn list_by_device(
        pool: &PgPool,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<TemperatureLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM temperature_logs \
             WHERE device_id = $1 \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, TemperatureLog>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
