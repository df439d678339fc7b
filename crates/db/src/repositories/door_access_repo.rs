//! Repository for the `door_accesses` table.

use sqlx::PgPool;

use crate::models::door_access::{CreateDoorAccess, DoorAccess};

const COLUMNS: &str = "id, event_id, user_id, device_id, action, recorded_at, created_at";

pub struct DoorAccessRepo;

impl DoorAccessRepo {
    pub async fn create(pool: &PgPool, input: &CreateDoorAccess) -> Result<DoorAccess, sqlx::Error> {
        let query = format!(
            "INSERT INTO door_accesses (event_id, user_id, device_id, action, recorded_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DoorAccess>(&query)
            .bind(&input.event_id)
            .bind(&input.user_id)
            .bind(&input.device_id)
            .bind(input.action)
            .bind(input.recorded_at)
            .fetch_one(pool)
            .await
    }

    /// List door events for a device, most recent first.
    pub async fn list_by_device(
        pool: &PgPool,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<DoorAccess>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM door_accesses \
             WHERE device_id = $1 \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, DoorAccess>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
