//! Route definitions for device event ingestion.

use axum::routing::post;
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// ```text
/// POST /events    -> handle_device_event
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(events::handle_device_event))
}
