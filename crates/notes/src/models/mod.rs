//! Domain models for synced notes

mod cursor;
mod note;

pub use cursor::SyncCursor;
pub use note::{Note, NoteBuilder, NoteId, LINK_KIND};
