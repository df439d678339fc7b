//! Shared response bodies.
//!
//! Devices only look at the `status` field, so both the HTTP endpoint and
//! the raw TCP relay answer with the same small envelope.

use serde::Serialize;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_RECEIVED: &str = "received";
pub const STATUS_ERROR: &str = "error";

/// `{ "status": ... }` acknowledgement, with an optional error message.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS,
            error: None,
        }
    }

    pub fn received() -> Self {
        Self {
            status: STATUS_RECEIVED,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR,
            error: Some(message.into()),
        }
    }
}
