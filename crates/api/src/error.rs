use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mb360_core::error::CoreError;
use serde_json::json;

/// PostgreSQL `check_violation`.
const PG_CHECK_VIOLATION: &str = "23514";

const SANITIZED_MESSAGE: &str = "An internal error occurred";

/// Error returned by HTTP handlers.
///
/// Every variant renders as `{"error": ..., "code": ...}`; internal details
/// are logged and replaced with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The request could not be read (e.g. malformed JSON).
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Status, machine-readable code and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Core(CoreError::UnknownEventType(kind)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("event_type: unknown event type '{kind}'"),
            ),
            AppError::Core(CoreError::Forbidden(msg)) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone())
            }
            AppError::Core(CoreError::Internal(msg)) | AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
            AppError::Database(err) => classify_db_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = json!({
            "error": message,
            "code": code,
        });
        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        SANITIZED_MESSAGE.to_string(),
    )
}

/// Map a sqlx error onto a response.
///
/// - A CHECK constraint rejection (a value the tables do not allow) is 400.
/// - An unreachable or exhausted pool is 503 so devices retry later.
/// - Anything else is a sanitized 500.
fn classify_db_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(PG_CHECK_VIOLATION) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            tracing::warn!(constraint, "Event rejected by table constraint");
            (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Value rejected by constraint {constraint}"),
            )
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            tracing::error!(error = %err, "Database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "DATABASE_UNAVAILABLE",
                "Database is temporarily unavailable".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
