use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: mb360_db::DbPool,
    /// Server configuration (device allowlist is read by the source extractor).
    pub config: Arc<ServerConfig>,
}
