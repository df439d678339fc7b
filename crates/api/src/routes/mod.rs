pub mod events;
pub mod health;
pub mod iclock;

use axum::Router;

use crate::state::AppState;

/// Build the device-facing route tree.
///
/// Route hierarchy:
///
/// ```text
/// /mb360/events        device event callback (POST)
/// /iclock/cdata        ADMS push handshake (GET, POST)
/// ```
///
/// Mounted both at the root and under `/api`.
pub fn device_routes() -> Router<AppState> {
    Router::new()
        .nest("/mb360", events::router())
        .nest("/iclock", iclock::router())
}
