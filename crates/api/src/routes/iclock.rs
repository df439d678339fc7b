use axum::routing::get;
use axum::Router;

use crate::handlers::iclock;
use crate::state::AppState;

/// ```text
/// GET  /cdata    -> cdata
/// POST /cdata    -> cdata
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/cdata", get(iclock::cdata).post(iclock::cdata))
}
