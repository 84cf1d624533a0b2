//! Auto-sync scheduling
//!
//! Pure functions that can be tested without a timer.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Check if a scheduled sync is due.
///
/// # Arguments
/// * `last_sync_at` - When the last run completed (None if never synced)
/// * `interval` - Minimum time between scheduled runs
///
/// # Returns
/// `true` if the interval has passed (or never synced), `false` otherwise
pub fn auto_sync_due(last_sync_at: Option<DateTime<Utc>>, interval: Duration) -> bool {
    match last_sync_at {
        Some(last) => {
            let elapsed = Utc::now() - last;
            elapsed.num_seconds() >= interval.as_secs() as i64
        }
        None => true,
    }
}
