//! Storage traits and implementations
//!
//! The host application owns the document store and settings persistence.
//! Sync only needs the small capability set in [`DocumentStore`] and
//! [`SettingsStore`], so a local filesystem, an embedded store or a test
//! double can stand behind them.

mod frontmatter;
mod fs;
mod memory;
mod settings;
mod traits;

pub use frontmatter::{parse_frontmatter, read_field};
pub use fs::FsDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use settings::{InMemorySettingsStore, JsonSettingsStore};
pub use traits::{DocumentHandle, DocumentStore, SettingsStore};
