//! The single validation-and-persistence path shared by every transport.
//!
//! HTTP callbacks, agent-forwarded polls and relay messages all end up
//! here, so a device event is checked and stored the same way no matter
//! how it arrived.

use mb360_core::event::RawEventPayload;
use mb360_db::models::StoredEvent;
use mb360_db::repositories::DeviceEventRepo;
use mb360_db::DbPool;

use crate::error::AppResult;

/// Validate `raw`, classify it and write it to the matching table.
///
/// `peer_device_id` is used as the device identifier unless the payload
/// names one itself.
pub async fn ingest(
    pool: &DbPool,
    raw: RawEventPayload,
    peer_device_id: &str,
) -> AppResult<StoredEvent> {
    let event = raw.into_event(peer_device_id)?;
    let stored = DeviceEventRepo::insert(pool, &event).await?;

    tracing::info!(
        id = stored.id(),
        event_type = %event.kind(),
        event_id = %event.event_id(),
        device_id = %event.device_id(),
        "Device event ingested"
    );
    Ok(stored)
}
