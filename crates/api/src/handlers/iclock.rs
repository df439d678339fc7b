//! ZKTeco ADMS push endpoint.
//!
//! Devices configured for "cloud server" mode call `/iclock/cdata` to
//! announce themselves and upload data. The bridge only records that the
//! call happened; event ingestion goes through `/mb360/events`.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, RawQuery};
use axum::http::Method;
use axum::Json;

/// GET|POST /iclock/cdata
///
/// Log the caller, query string and body, then acknowledge with `[]`.
pub async fn cdata(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    RawQuery(query): RawQuery,
    body: String,
) -> Json<serde_json::Value> {
    tracing::info!(
        ip = %addr.ip(),
        %method,
        query = query.as_deref().unwrap_or(""),
        body_len = body.len(),
        body = %body,
        "cdata"
    );
    Json(serde_json::json!([]))
}
