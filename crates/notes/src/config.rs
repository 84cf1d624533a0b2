//! Sync settings and timing configuration
//!
//! Settings are loaded from a JSON file (~/.config/notepull/settings.json by
//! default), falling back to defaults. An empty token is taken from the
//! environment when present.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::SyncCursor;

/// Settings filename in the config directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variable consulted when no token is stored
const TOKEN_ENV: &str = "NOTEPULL_TOKEN";

/// Lower bound for the auto-sync interval
pub const MIN_AUTO_SYNC_MINUTES: u64 = 5;

const DEFAULT_API_BASE_URL: &str = "https://api.notes.example.com/v1";
const DEFAULT_FOLDER: &str = "Notes";
const DEFAULT_AUTO_SYNC_MINUTES: u64 = 30;

/// Persisted configuration consumed and updated by the sync engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Long-lived refresh token issued by the notes service
    pub refresh_token: String,
    /// Destination folder inside the document store
    pub folder: String,
    /// Base URL of the notes service API
    pub api_base_url: String,
    /// Resume point and last completion time
    #[serde(flatten)]
    pub cursor: SyncCursor,
    /// Whether the background timer should trigger silent syncs
    pub auto_sync_enabled: bool,
    /// Configured auto-sync interval, see [`SyncSettings::effective_interval_minutes`]
    pub auto_sync_interval_minutes: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            refresh_token: String::new(),
            folder: DEFAULT_FOLDER.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cursor: SyncCursor::default(),
            auto_sync_enabled: false,
            auto_sync_interval_minutes: DEFAULT_AUTO_SYNC_MINUTES,
        }
    }
}

impl SyncSettings {
    /// Load settings from a specific JSON file, falling back to defaults if absent
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            config::load_json_file(path)?
        } else {
            Self::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if self.refresh_token.trim().is_empty()
            && let Ok(token) = std::env::var(TOKEN_ENV)
        {
            self.refresh_token = token;
        }
    }

    /// Basic shape check for the stored token
    pub fn has_credential(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }

    /// Auto-sync interval with the minimum applied
    pub fn effective_interval_minutes(&self) -> u64 {
        self.auto_sync_interval_minutes.max(MIN_AUTO_SYNC_MINUTES)
    }

    /// Auto-sync interval as a duration
    pub fn effective_interval(&self) -> Duration {
        Duration::from_secs(self.effective_interval_minutes() * 60)
    }
}

/// Delays and retry bounds used while talking to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    /// Backoff base; attempt `n` waits `base * 2^n`
    pub retry_base_delay: Duration,
    /// Total attempts for retryable failures, including the first
    pub max_attempts: u32,
    /// Pause between page requests
    pub page_delay: Duration,
    /// Pause after each link detail request
    pub detail_delay: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            retry_base_delay: Duration::from_millis(1000),
            max_attempts: 3,
            page_delay: Duration::from_millis(500),
            detail_delay: Duration::from_millis(300),
        }
    }
}

impl SyncTiming {
    /// Backoff before the attempt following `attempt` (0-based)
    ///
    /// For rate limiting, the server's `Retry-After` (seconds) wins when longer.
    pub fn backoff(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let computed = self.retry_base_delay * 2u32.saturating_pow(attempt);
        match retry_after_secs {
            Some(secs) => computed.max(Duration::from_millis(secs.saturating_mul(1000))),
            None => computed,
        }
    }
}
