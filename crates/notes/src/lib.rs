//! Notes crate - One-way sync from a notes service into markdown documents
//!
//! This crate provides:
//! - Domain models (Note, NoteId, SyncCursor)
//! - Notes API client with retry, backoff and token refresh
//! - Document store abstractions (filesystem and in-memory)
//! - Idempotent, cancellable sync engine and auto-sync policy
//! - Markdown rendering with YAML frontmatter
//!
//! All I/O is blocking; hosts run syncs on a worker thread.

pub mod cancel;
pub mod config;
pub mod models;
pub mod remote;
pub mod render;
pub mod storage;
pub mod sync;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use cancel::CancelToken;
pub use config::{SyncSettings, SyncTiming};
pub use models::{Note, NoteId, SyncCursor};
pub use remote::{ApiError, NotesClient, Session, TokenProvider};
pub use render::{document_path, render_document, sanitize_filename};
pub use storage::{
    DocumentHandle, DocumentStore, FsDocumentStore, InMemoryDocumentStore, InMemorySettingsStore,
    JsonSettingsStore, SettingsStore,
};
pub use sync::{
    AutoSync, LogNotifier, Notifier, SkipReason, SyncError, SyncMode, SyncOutcome, SyncStats,
    Syncer, TickOutcome, auto_sync_due,
};
