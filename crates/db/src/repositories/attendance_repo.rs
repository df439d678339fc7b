//! Repository for the `attendances` table.

use sqlx::PgPool;

use crate::models::attendance::{Attendance, CreateAttendance};

/// Column list for `attendances` queries.
const COLUMNS: &str = "\
    id, event_id, user_id, device_id, verify_mode, punch_state, \
    recorded_at, created_at";

/// Provides query operations for attendance punches.
pub struct AttendanceRepo;

impl AttendanceRepo {
    /// Insert a new attendance punch, returning the stored row.
    pub async fn create(pool: &PgPool, input: &CreateAttendance) -> Result<Attendance, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendances \
                (event_id, user_id, device_id, verify_mode, punch_state, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(&input.event_id)
            .bind(&input.user_id)
            .bind(&input.device_id)
            .bind(input.verify_mode)
            .bind(input.punch_state)
            .bind(input.recorded_at)
            .fetch_one(pool)
            .await
    }

    /// List punches recorded by a device, most recent first.
    pub async fn list_by_device(
        pool: &PgPool,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendances \
             WHERE device_id = $1 \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count punches carrying the given device event id.
    ///
    /// No uniqueness is enforced, so a redelivered event counts twice.
    pub async fn count_by_event_id(pool: &PgPool, event_id: &str) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendances WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
