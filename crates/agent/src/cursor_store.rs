//! JSON file persistence for the poll cursor.

use std::io;
use std::path::{Path, PathBuf};

use mb360_core::cursor::PollCursor;

#[derive(Debug, thiserror::Error)]
pub enum CursorStoreError {
    #[error("Cursor file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Cursor file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keeps a [`PollCursor`] in a small JSON file so restarts resume where
/// the last run stopped.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored cursor; a missing file means nothing was forwarded yet.
    pub async fn load(&self) -> Result<PollCursor, CursorStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PollCursor::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a sibling temp file so a crash never leaves half a file.
    pub async fn save(&self, cursor: &PollCursor) -> Result<(), CursorStoreError> {
        let bytes = serde_json::to_vec_pretty(cursor)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("cursor.json"));

        assert_eq!(store.load().await.unwrap(), PollCursor::new());
    }

    #[tokio::test]
    async fn saved_cursor_is_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("cursor.json"));
        let cursor = PollCursor::starting_at(Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());

        store.save(&cursor).await.unwrap();

        assert_eq!(store.load().await.unwrap(), cursor);
        assert!(!dir.path().join("cursor.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cursor.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert_matches!(CursorStore::new(path).load().await, Err(CursorStoreError::Json(_)));
    }
}
