//! Resume cursor for incremental note sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marks the boundary between already-synced and new notes
///
/// Persisted inside the sync settings. The service lists notes newest-first,
/// so the newest note seen by a completed run is a safe place to stop the
/// next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// ID of the newest note seen by the last completed run
    #[serde(default)]
    pub last_synced_id: Option<String>,
    /// When the last run finished
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl SyncCursor {
    /// Create a cursor pointing at a known note
    pub fn new(last_synced_id: impl Into<String>) -> Self {
        Self {
            last_synced_id: Some(last_synced_id.into()),
            last_sync_at: Some(Utc::now()),
        }
    }

    /// Whether `note_id` is the note the previous run stopped at
    pub fn is_boundary(&self, note_id: &str) -> bool {
        self.last_synced_id.as_deref() == Some(note_id)
    }

    /// Record a finished run
    ///
    /// `newest` is the first note of the first fetched page, if there was one.
    /// A run that saw no notes keeps the previous boundary.
    pub fn complete(&mut self, newest: Option<String>) {
        if let Some(id) = newest {
            self.last_synced_id = Some(id);
        }
        self.last_sync_at = Some(Utc::now());
    }

    /// Forget the boundary so the next run walks the whole history
    pub fn reset(&mut self) {
        self.last_synced_id = None;
    }
}
