//! Handler for device event callbacks.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use mb360_core::event::RawEventPayload;

use crate::error::{AppError, AppResult};
use crate::ingest::ingest;
use crate::middleware::device::DeviceSource;
use crate::response::StatusResponse;
use crate::state::AppState;

/// POST /mb360/events
///
/// Receive one event from the device's HTTP notification feature (or from
/// the polling agent), validate it and persist the matching record.
///
/// Malformed JSON is answered with `BAD_REQUEST` in the usual error body.
pub async fn handle_device_event(
    State(state): State<AppState>,
    source: DeviceSource,
    body: Bytes,
) -> AppResult<Json<StatusResponse>> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?;

    let raw = RawEventPayload::from_json(value)?;
    ingest(&state.pool, raw, &source.device_id()).await?;

    Ok(Json(StatusResponse::success()))
}
