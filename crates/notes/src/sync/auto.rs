//! Background sync policy
//!
//! Decides when a timer tick should run a silent sync, and turns auto-sync
//! off when the stored token keeps failing.

use log::{debug, info, warn};

use super::engine::{SkipReason, SyncError, SyncMode, SyncOutcome, Syncer};
use super::timing::auto_sync_due;
use crate::cancel::CancelToken;
use crate::config::SyncSettings;

/// Consecutive auth failures before auto-sync is switched off
pub const MAX_CONSECUTIVE_AUTH_FAILURES: u32 = 3;

/// What a timer tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// Auto-sync is off or the interval hasn't elapsed
    NotDue,
    /// A sync ran (or was skipped by the syncer)
    Ran(SyncOutcome),
    /// The token was rejected; auto-sync stays on for now
    AuthFailed { consecutive: u32 },
    /// The token was rejected too often; auto-sync is now off
    Disabled,
}

/// Auto-sync state kept across timer ticks
#[derive(Debug)]
pub struct AutoSync {
    consecutive_auth_failures: u32,
    max_auth_failures: u32,
}

impl Default for AutoSync {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoSync {
    pub fn new() -> Self {
        Self::with_threshold(MAX_CONSECUTIVE_AUTH_FAILURES)
    }

    pub fn with_threshold(max_auth_failures: u32) -> Self {
        Self {
            consecutive_auth_failures: 0,
            max_auth_failures: max_auth_failures.max(1),
        }
    }

    pub fn consecutive_auth_failures(&self) -> u32 {
        self.consecutive_auth_failures
    }

    /// Whether a tick right now would start a run
    pub fn is_due(&self, settings: &SyncSettings) -> bool {
        settings.auto_sync_enabled
            && auto_sync_due(settings.cursor.last_sync_at, settings.effective_interval())
    }

    /// Handle one timer tick
    pub fn tick(
        &mut self,
        syncer: &Syncer,
        settings: &mut SyncSettings,
        cancel: &CancelToken,
    ) -> TickOutcome {
        if !self.is_due(settings) {
            return TickOutcome::NotDue;
        }

        debug!("Auto-sync due; starting silent sync");
        match syncer.run(settings, SyncMode::Silent, cancel) {
            Ok(SyncOutcome::Skipped(SkipReason::AlreadyRunning)) => {
                TickOutcome::Ran(SyncOutcome::Skipped(SkipReason::AlreadyRunning))
            }
            Ok(outcome) => {
                self.consecutive_auth_failures = 0;
                TickOutcome::Ran(outcome)
            }
            Err(SyncError::AuthFatal(e)) => {
                debug!("Scheduled sync rejected: {}", e);
                self.record_auth_failure(syncer, settings)
            }
        }
    }

    fn record_auth_failure(&mut self, syncer: &Syncer, settings: &mut SyncSettings) -> TickOutcome {
        self.consecutive_auth_failures += 1;
        let consecutive = self.consecutive_auth_failures;

        if consecutive < self.max_auth_failures {
            warn!(
                "Scheduled sync rejected the API token ({}/{})",
                consecutive, self.max_auth_failures
            );
            return TickOutcome::AuthFailed { consecutive };
        }

        info!(
            "Disabling auto-sync after {} consecutive authentication failures",
            consecutive
        );
        settings.auto_sync_enabled = false;
        self.consecutive_auth_failures = 0;
        if let Err(e) = syncer.save_settings(settings) {
            warn!("Failed to save settings after disabling auto-sync: {:#}", e);
        }
        syncer.notifier().notify(
            "Auto-sync turned off: the API token was rejected repeatedly. Update the token and re-enable auto-sync.",
        );
        TickOutcome::Disabled
    }
}
