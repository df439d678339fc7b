//! Drains relay messages into the shared ingest path.

use mb360_core::event::RawEventPayload;
use mb360_db::DbPool;
use tokio::sync::mpsc;

use crate::error::AppResult;
use crate::ingest::ingest;
use crate::middleware::device::device_id_for;

use super::RelayMessage;

/// Validate and store every message until all senders are dropped.
///
/// The device already got its acknowledgement, so failures are only
/// logged.
pub async fn run(pool: DbPool, mut receiver: mpsc::Receiver<RelayMessage>) {
    while let Some(message) = receiver.recv().await {
        let peer = message.peer;
        if let Err(e) = process(&pool, message).await {
            tracing::warn!(%peer, error = %e, "Relay message rejected");
        }
    }
    tracing::info!("Relay channel closed, processor shutting down");
}

async fn process(pool: &DbPool, message: RelayMessage) -> AppResult<()> {
    let raw = RawEventPayload::from_relay(message.body)?;
    ingest(pool, raw, &device_id_for(message.peer.ip())).await?;
    Ok(())
}
