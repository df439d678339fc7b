//! Periodic pull of the device attendance log.
//!
//! Each cycle fetches the whole log, keeps records newer than the
//! [`PollCursor`] and forwards them oldest first. The cursor moves past a
//! timestamp only once every record carrying it was accepted, so a failed
//! forward is retried on the next cycle instead of being skipped.

use std::time::Duration;

use mb360_core::attlog::AttendanceRecord;
use mb360_core::cursor::PollCursor;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cursor_store::{CursorStore, CursorStoreError};
use crate::forwarder::{EventSink, ForwardError};
use crate::session::{AttendanceSource, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Device fetch failed: {0}")]
    Session(#[from] SessionError),

    #[error("Forwarding {event_id} failed: {source}")]
    Forward {
        event_id: String,
        #[source]
        source: ForwardError,
    },

    #[error(transparent)]
    Cursor(#[from] CursorStoreError),
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Records parsed from the device response.
    pub fetched: usize,
    /// Records accepted by the sink.
    pub forwarded: usize,
}

pub struct Poller<S, K> {
    source: S,
    sink: K,
    cursor: PollCursor,
    store: Option<CursorStore>,
}

impl<S, K> Poller<S, K>
where
    S: AttendanceSource,
    K: EventSink,
{
    pub fn new(source: S, sink: K, cursor: PollCursor) -> Self {
        Self {
            source,
            sink,
            cursor,
            store: None,
        }
    }

    /// Persist the cursor to `store` whenever it moves.
    pub fn with_store(mut self, store: CursorStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cursor(&self) -> PollCursor {
        self.cursor
    }

    /// Fetch, filter and forward once.
    pub async fn poll_cycle(&mut self) -> Result<CycleReport, PollError> {
        let records = self.source.fetch_records().await?;
        let fresh = self.cursor.select_new(&records);
        tracing::debug!(fetched = records.len(), fresh = fresh.len(), "Attendance log fetched");

        let before = self.cursor;
        let outcome = self.forward_all(&fresh).await;

        // Keep whatever progress was made, even when a forward failed.
        if self.cursor != before {
            if let Some(store) = &self.store {
                store.save(&self.cursor).await?;
            }
        }

        Ok(CycleReport {
            fetched: records.len(),
            forwarded: outcome?,
        })
    }

    async fn forward_all(&mut self, fresh: &[&AttendanceRecord]) -> Result<usize, PollError> {
        let device_id = self.source.device_id().to_string();
        let mut forwarded = 0;

        for (i, record) in fresh.iter().enumerate() {
            let submission = record.to_submission(&device_id);
            if let Err(source) = self.sink.forward(&submission).await {
                return Err(PollError::Forward {
                    event_id: submission.event_id,
                    source,
                });
            }
            forwarded += 1;

            let group_done = fresh
                .get(i + 1)
                .map_or(true, |next| next.recorded_at != record.recorded_at);
            if group_done {
                self.cursor.advance(record.recorded_at);
            }
        }

        Ok(forwarded)
    }

    /// Run a cycle every `interval` until `cancel` fires.
    ///
    /// Failed cycles are logged and the loop carries on with the next tick.
    pub async fn run(mut self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Poller stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_cycle().await {
                        Ok(report) => tracing::info!(
                            fetched = report.fetched,
                            forwarded = report.forwarded,
                            last_seen = ?self.cursor.last_seen,
                            "Poll cycle complete",
                        ),
                        Err(e) => tracing::error!(
                            device = %self.source.device_id(),
                            error = %e,
                            "Poll cycle failed",
                        ),
                    }
                }
            }
        }
    }
}
