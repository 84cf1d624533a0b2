//! Note sync orchestration
//!
//! Walks the service's notes newest-first, writing one document per note
//! until it reaches the note the previous run started from.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::notify::Notifier;
use crate::cancel::CancelToken;
use crate::config::SyncSettings;
use crate::models::Note;
use crate::remote::api::RawNote;
use crate::remote::{
    ApiError, NotePages, NotesClient, Session, fetch_link_detail, is_auth_fatal, normalize_note,
};
use crate::render::{NOTE_ID_FIELD, document_path, render_document, sanitize_filename};
use crate::storage::{DocumentHandle, DocumentStore, SettingsStore};

/// Whether a run may talk to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Started by the user: progress, summary and errors are shown
    Interactive,
    /// Started by the timer: nothing is shown
    Silent,
}

/// Statistics from a sync run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    /// Number of documents written
    pub synced: usize,
    /// Number of notes skipped (already synced or unusable)
    pub skipped: usize,
    /// Number of notes that failed
    pub errors: usize,
    /// Number of pages fetched
    pub pages: usize,
    /// The run stopped early on request
    pub cancelled: bool,
    /// Duration of the run
    pub duration_ms: u64,
}

/// Why a run did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No API token configured
    MissingCredential,
    /// Another run on this syncer is still active
    AlreadyRunning,
}

/// Result of [`Syncer::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Completed(SyncStats),
}

/// Failures that abort a run
///
/// Everything else is logged and counted in [`SyncStats::errors`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The API token is unusable; nothing in this run can succeed
    #[error("{0}")]
    AuthFatal(ApiError),
}

impl SyncError {
    pub fn is_auth_fatal(&self) -> bool {
        matches!(self, SyncError::AuthFatal(_))
    }
}

enum NoteResult {
    Synced(String),
    Skipped,
}

/// Clears the running flag when a run ends, however it ends
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One-way sync from the notes service into a document store
///
/// At most one run is active per instance; a second trigger is rejected.
pub struct Syncer {
    client: NotesClient,
    store: Arc<dyn DocumentStore>,
    settings_store: Arc<dyn SettingsStore>,
    notifier: Arc<dyn Notifier>,
    syncing: AtomicBool,
}

impl Syncer {
    pub fn new(
        client: NotesClient,
        store: Arc<dyn DocumentStore>,
        settings_store: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            store,
            settings_store,
            notifier,
            syncing: AtomicBool::new(false),
        }
    }

    /// Whether a run is in progress
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Persist settings through the configured store
    pub fn save_settings(&self, settings: &SyncSettings) -> Result<()> {
        self.settings_store.save(settings)
    }

    fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard(&self.syncing))
    }

    /// Run one sync
    ///
    /// Updates `settings.cursor` and persists the settings when the run
    /// ends, including after cancellation. Note, folder and settings
    /// failures are counted in the returned stats; only an unusable token
    /// aborts the run.
    pub fn run(
        &self,
        settings: &mut SyncSettings,
        mode: SyncMode,
        cancel: &CancelToken,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.try_begin() else {
            match mode {
                SyncMode::Interactive => {
                    warn!("Sync requested while another sync is running");
                    self.notifier.notify("A sync is already in progress");
                }
                SyncMode::Silent => debug!("Skipping scheduled sync: another sync is running"),
            }
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        if !settings.has_credential() {
            info!("No API token configured; nothing to sync");
            if mode == SyncMode::Interactive {
                self.notifier.notify("Set an API token before syncing");
            }
            return Ok(SyncOutcome::Skipped(SkipReason::MissingCredential));
        }

        let result = self.sync_notes(settings, mode, cancel);

        match &result {
            Ok(stats) => {
                info!(
                    "Sync {}: {} synced, {} skipped, {} errors in {}ms",
                    if stats.cancelled { "cancelled" } else { "complete" },
                    stats.synced,
                    stats.skipped,
                    stats.errors,
                    stats.duration_ms
                );
                if mode == SyncMode::Interactive {
                    self.notifier.notify(&summary(stats));
                }
            }
            Err(e) => {
                error!("Sync failed: {}", e);
                if mode == SyncMode::Interactive {
                    self.notifier.notify(&format!("Sync failed: {}", e));
                }
            }
        }

        result.map(SyncOutcome::Completed)
    }

    fn sync_notes(
        &self,
        settings: &mut SyncSettings,
        mode: SyncMode,
        cancel: &CancelToken,
    ) -> Result<SyncStats, SyncError> {
        let start = Instant::now();
        let mut stats = SyncStats::default();

        // 1. Exchange the stored token for an access token
        let session =
            Session::open(&self.client, &settings.refresh_token).map_err(SyncError::AuthFatal)?;

        // 2. Make sure the destination exists
        let folder = settings.folder.trim_matches('/').to_string();
        if let Err(e) = self.prepare_folder(&folder) {
            error!("Failed to prepare sync folder {}: {:#}", folder, e);
            stats.errors += 1;
            stats.duration_ms = start.elapsed().as_millis() as u64;
            return Ok(stats);
        }

        // 3. Drain pages until we meet the previous cursor
        let mut newest: Option<String> = None;
        let mut first_page = true;
        let mut reached_cursor = false;

        for page in NotePages::new(&self.client, &session, cancel) {
            let page = match page {
                Ok(page) => page,
                Err(e) if e.is_auth_fatal() => return Err(SyncError::AuthFatal(e)),
                Err(e) => {
                    error!("Failed to fetch notes: {}", e);
                    stats.errors += 1;
                    break;
                }
            };
            stats.pages += 1;

            for raw in page.notes {
                let note_id = raw.id();

                if first_page && newest.is_none() {
                    newest = note_id.clone();
                }

                if note_id
                    .as_deref()
                    .is_some_and(|id| settings.cursor.is_boundary(id))
                {
                    debug!("Reached previously synced note; stopping");
                    reached_cursor = true;
                    break;
                }

                match self.process_note(raw, &folder, &session) {
                    Ok(NoteResult::Synced(path)) => {
                        debug!("Wrote {}", path);
                        stats.synced += 1;
                    }
                    Ok(NoteResult::Skipped) => stats.skipped += 1,
                    Err(e) if is_auth_fatal(&e) => {
                        let err = e
                            .downcast::<ApiError>()
                            .unwrap_or_else(|e| ApiError::AuthFatal(format!("{:#}", e)));
                        return Err(SyncError::AuthFatal(err));
                    }
                    Err(e) => {
                        warn!(
                            "Failed to sync note {}: {:#}",
                            note_id.as_deref().unwrap_or("<no id>"),
                            e
                        );
                        stats.errors += 1;
                    }
                }

                if cancel.is_cancelled() {
                    break;
                }
            }
            first_page = false;

            if mode == SyncMode::Interactive {
                self.notifier.notify(&format!(
                    "Syncing notes: {} synced, {} skipped",
                    stats.synced, stats.skipped
                ));
            }

            if reached_cursor || cancel.is_cancelled() {
                break;
            }
        }

        // 4. Record the new resume point
        stats.cancelled = cancel.is_cancelled();
        settings.cursor.complete(newest);
        if let Err(e) = self.settings_store.save(settings) {
            error!("Failed to save sync settings: {:#}", e);
            stats.errors += 1;
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    fn prepare_folder(&self, folder: &str) -> Result<()> {
        if folder.is_empty() || self.store.folder_exists(folder)? {
            return Ok(());
        }
        info!("Creating sync folder {}", folder);
        self.store.create_folder(folder)
    }

    /// Normalize, dedup, enrich and write one note
    fn process_note(&self, raw: RawNote, folder: &str, session: &Session) -> Result<NoteResult> {
        let Some(mut note) = normalize_note(raw) else {
            debug!("Skipping note without an ID");
            return Ok(NoteResult::Skipped);
        };

        let candidate = document_path(folder, &sanitize_filename(&note.title));
        if let Some(handle) = self.store.file_exists(&candidate)?
            && self.stored_id(&handle)?.as_deref() == Some(note.id.as_str())
        {
            debug!("Note {} already synced at {}", note.id.as_str(), candidate);
            return Ok(NoteResult::Skipped);
        }

        if note.is_link() {
            note.original_content = fetch_link_detail(&self.client, session, &note.id)?;
            let executor = self.client.executor();
            executor.pause(executor.timing().detail_delay);
        }

        let document = render_document(&note);
        let name = resolve_filename(self.store.as_ref(), folder, &note)?;
        let path = document_path(folder, &name);

        // A suffixed copy may already exist from an earlier run
        if path != candidate
            && let Some(handle) = self.store.file_exists(&path)?
            && self.stored_id(&handle)?.as_deref() == Some(note.id.as_str())
        {
            debug!("Note {} already synced at {}", note.id.as_str(), path);
            return Ok(NoteResult::Skipped);
        }

        self.store
            .create_file(&path, &document)
            .with_context(|| format!("Failed to write {}", path))?;
        Ok(NoteResult::Synced(path))
    }

    fn stored_id(&self, handle: &DocumentHandle) -> Result<Option<String>> {
        self.store.frontmatter_field(handle, NOTE_ID_FIELD)
    }
}

/// Pick the document name for a note
///
/// The sanitized title, unless a document with a different (or no) stored
/// note ID already occupies it; then the first six characters of the note
/// ID are appended.
pub fn resolve_filename(store: &dyn DocumentStore, folder: &str, note: &Note) -> Result<String> {
    let name = sanitize_filename(&note.title);

    match store.file_exists(&document_path(folder, &name))? {
        Some(handle) => {
            let stored = store.frontmatter_field(&handle, NOTE_ID_FIELD)?;
            if stored.as_deref() == Some(note.id.as_str()) {
                Ok(name)
            } else {
                Ok(format!("{}-{}", name, note.id.short()))
            }
        }
        None => Ok(name),
    }
}

fn summary(stats: &SyncStats) -> String {
    format!(
        "Sync {}: {} synced, {} skipped, {} errors",
        if stats.cancelled { "cancelled" } else { "complete" },
        stats.synced,
        stats.skipped,
        stats.errors
    )
}
