//! Sync engine for pulling notes into a document store
//!
//! Runs are idempotent: notes already written are recognised by the ID in
//! their frontmatter, and the cursor lets later runs stop early.

mod auto;
mod engine;
mod notify;
mod timing;

pub use auto::{AutoSync, MAX_CONSECUTIVE_AUTH_FAILURES, TickOutcome};
pub use engine::{
    SkipReason, SyncError, SyncMode, SyncOutcome, SyncStats, Syncer, resolve_filename,
};
pub use notify::{LogNotifier, Notifier};
pub use timing::auto_sync_due;
