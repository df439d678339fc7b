//! Delivery of attendance submissions to the bridge API.

use std::time::Duration;

use async_trait::async_trait;
use mb360_core::attlog::EventSubmission;

/// Path of the ingest endpoint, relative to the API base URL.
pub const EVENTS_PATH: &str = "/mb360/events";

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status code.
    #[error("API returned HTTP {0}")]
    HttpStatus(u16),
}

/// Where the poller sends new records.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn forward(&self, submission: &EventSubmission) -> Result<(), ForwardError>;
}

/// Posts submissions to `POST {api}/mb360/events`, one request each.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpForwarder {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{EVENTS_PATH}", api_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventSink for HttpForwarder {
    async fn forward(&self, submission: &EventSubmission) -> Result<(), ForwardError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ForwardError::HttpStatus(response.status().as_u16()));
        }
        tracing::debug!(event_id = %submission.event_id, "Event forwarded");
        Ok(())
    }
}
