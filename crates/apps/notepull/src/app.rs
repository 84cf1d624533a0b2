//! Command implementations
//!
//! Sync runs are blocking, so they go to tokio's blocking pool; the async
//! side only waits for Ctrl-C and the watch timer.

use anyhow::{Result, bail};
use chrono::Local;
use log::{info, warn};
use notes::{
    AutoSync, CancelToken, FsDocumentStore, JsonSettingsStore, Notifier, NotesClient,
    SettingsStore, SyncMode, SyncOutcome, SyncSettings, SyncTiming, Syncer, TickOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Interval;

/// How often `watch` checks whether a scheduled sync is due
const WATCH_TICK: Duration = Duration::from_secs(60);

/// How often `watch` looks for a cancellation between ticks
const CANCEL_POLL: Duration = Duration::from_millis(200);

/// Prints notifications to the terminal
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

pub struct App {
    vault: PathBuf,
    settings_store: Arc<JsonSettingsStore>,
    settings: SyncSettings,
}

impl App {
    /// Load settings from `settings_path`, or the default location
    pub fn open(vault: PathBuf, settings_path: Option<PathBuf>) -> Result<Self> {
        let settings_store = match settings_path {
            Some(path) => JsonSettingsStore::new(path),
            None => JsonSettingsStore::default_location()?,
        };
        let settings = settings_store.load()?;

        Ok(Self {
            vault,
            settings_store: Arc::new(settings_store),
            settings,
        })
    }

    fn save(&self) -> Result<()> {
        self.settings_store.save(&self.settings)
    }

    fn build_syncer(&self) -> Result<Arc<Syncer>> {
        let store = FsDocumentStore::new(&self.vault)?;
        let client = NotesClient::new(self.settings.api_base_url.clone(), SyncTiming::default());

        Ok(Arc::new(Syncer::new(
            client,
            Arc::new(store),
            self.settings_store.clone(),
            Arc::new(ConsoleNotifier),
        )))
    }

    /// One interactive sync
    pub async fn sync(&mut self) -> Result<()> {
        let syncer = self.build_syncer()?;
        let cancel = CancelToken::new();
        let ctrl_c = cancel_on_ctrl_c(cancel.clone());

        let mut settings = self.settings.clone();
        let (outcome, settings) = tokio::task::spawn_blocking(move || {
            let outcome = syncer.run(&mut settings, SyncMode::Interactive, &cancel);
            (outcome, settings)
        })
        .await?;
        ctrl_c.abort();

        self.settings = settings;
        outcome?;
        Ok(())
    }

    /// Run scheduled silent syncs until Ctrl-C or until auto-sync turns itself off
    pub async fn watch(&mut self) -> Result<()> {
        if !self.settings.auto_sync_enabled {
            println!("Auto-sync is off. Turn it on with `notepull auto on`.");
            return Ok(());
        }

        let syncer = self.build_syncer()?;
        let cancel = CancelToken::new();
        let ctrl_c = cancel_on_ctrl_c(cancel.clone());
        let mut auto = AutoSync::new();
        let mut settings = self.settings.clone();
        let mut ticker = tokio::time::interval(WATCH_TICK);

        info!(
            "Watching {}: syncing every {} minutes",
            self.vault.display(),
            settings.effective_interval_minutes()
        );

        while next_tick(&mut ticker, &cancel).await {
            let run_syncer = syncer.clone();
            let run_cancel = cancel.clone();
            let (returned_auto, returned_settings, outcome) =
                tokio::task::spawn_blocking(move || {
                    let outcome = auto.tick(&run_syncer, &mut settings, &run_cancel);
                    (auto, settings, outcome)
                })
                .await?;
            auto = returned_auto;
            settings = returned_settings;

            match outcome {
                TickOutcome::NotDue => {}
                TickOutcome::Ran(SyncOutcome::Completed(stats)) => info!(
                    "Scheduled sync: {} synced, {} skipped, {} errors",
                    stats.synced, stats.skipped, stats.errors
                ),
                TickOutcome::Ran(SyncOutcome::Skipped(reason)) => {
                    info!("Scheduled sync skipped: {:?}", reason)
                }
                TickOutcome::AuthFailed { consecutive } => {
                    warn!("Scheduled sync failed authentication ({} in a row)", consecutive)
                }
                TickOutcome::Disabled => break,
            }
        }

        ctrl_c.abort();
        self.settings = settings;
        info!("Stopped watching");
        Ok(())
    }

    pub fn status(&self, json: bool) -> Result<()> {
        let settings = &self.settings;

        if json {
            let mut redacted = settings.clone();
            if redacted.has_credential() {
                redacted.refresh_token = "<redacted>".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&redacted)?);
            return Ok(());
        }

        println!("Settings:   {}", self.settings_store.path().display());
        println!("Vault:      {}", self.vault.display());
        println!("Folder:     {}", settings.folder);
        println!("API:        {}", settings.api_base_url);
        println!(
            "Token:      {}",
            if settings.has_credential() { "set" } else { "not set" }
        );
        println!(
            "Auto-sync:  {}",
            if settings.auto_sync_enabled {
                format!("on, every {} minutes", settings.effective_interval_minutes())
            } else {
                "off".to_string()
            }
        );
        match settings.cursor.last_sync_at {
            Some(at) => println!(
                "Last sync:  {}",
                at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ),
            None => println!("Last sync:  never"),
        }
        println!(
            "Resume at:  {}",
            settings.cursor.last_synced_id.as_deref().unwrap_or("(start)")
        );
        Ok(())
    }

    pub fn login(&mut self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            bail!("Token must not be empty");
        }
        self.settings.refresh_token = token.to_string();
        self.save()?;
        println!("Token saved");
        Ok(())
    }

    pub fn set_folder(&mut self, path: &str) -> Result<()> {
        let folder = path.trim().trim_matches('/');
        if folder.split('/').any(|part| part == "..") {
            bail!("Folder must stay inside the vault: {}", path);
        }
        self.settings.folder = folder.to_string();
        self.save()?;
        println!("Notes will be written to {}/", self.settings.folder);
        Ok(())
    }

    pub fn set_auto_sync(&mut self, enabled: bool, interval: Option<u64>) -> Result<()> {
        self.settings.auto_sync_enabled = enabled;
        if let Some(minutes) = interval {
            self.settings.auto_sync_interval_minutes = minutes;
        }
        self.save()?;

        if enabled {
            println!(
                "Auto-sync on, every {} minutes",
                self.settings.effective_interval_minutes()
            );
        } else {
            println!("Auto-sync off");
        }
        Ok(())
    }

    pub fn reset_cursor(&mut self) -> Result<()> {
        self.settings.cursor.reset();
        self.save()?;
        println!("The next sync will walk the whole note history");
        Ok(())
    }
}

/// Wait for the next watch tick; false once `cancel` fires
///
/// A Ctrl-C that lands during a blocking tick is seen here right after it.
async fn next_tick(ticker: &mut Interval, cancel: &CancelToken) -> bool {
    tokio::select! {
        biased;
        _ = cancelled(cancel) => false,
        _ = ticker.tick() => true,
    }
}

async fn cancelled(cancel: &CancelToken) {
    while !cancel.is_cancelled() {
        tokio::time::sleep(CANCEL_POLL).await;
    }
}

/// Cancel `cancel` on the first Ctrl-C
fn cancel_on_ctrl_c(cancel: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; stopping after the current note");
            cancel.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_next_tick_runs_until_cancelled() {
        let cancel = CancelToken::new();
        let mut ticker = tokio::time::interval(WATCH_TICK);

        // First tick fires immediately
        assert!(next_tick(&mut ticker, &cancel).await);

        // Cancelled mid-interval: returns without waiting out the tick
        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_secs(5), next_tick(&mut ticker, &cancel)).await;
        assert_eq!(next.ok(), Some(false));
    }
}
