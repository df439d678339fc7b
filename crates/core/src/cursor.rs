//! Last-seen cursor for the polling relay.

use serde::{Deserialize, Serialize};

use crate::attlog::AttendanceRecord;
use crate::types::Timestamp;

/// Tracks the newest attendance record already forwarded.
///
/// Records at or before `last_seen` are considered delivered. The cursor
/// only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCursor {
    pub last_seen: Option<Timestamp>,
}

impl PollCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(last_seen: Timestamp) -> Self {
        Self {
            last_seen: Some(last_seen),
        }
    }

    pub fn is_new(&self, record: &AttendanceRecord) -> bool {
        self.last_seen
            .map_or(true, |seen| record.recorded_at > seen)
    }

    /// Records newer than the cursor, oldest first.
    pub fn select_new<'a>(&self, records: &'a [AttendanceRecord]) -> Vec<&'a AttendanceRecord> {
        let mut fresh: Vec<_> = records.iter().filter(|r| self.is_new(r)).collect();
        fresh.sort_by_key(|r| r.recorded_at);
        fresh
    }

    /// Move the cursor to `seen` unless it already points later.
    pub fn advance(&mut self, seen: Timestamp) {
        if self.last_seen.map_or(true, |current| seen > current) {
            self.last_seen = Some(seen);
        }
    }
}
