//! Storage trait definitions

use anyhow::Result;

use crate::config::SyncSettings;

/// Handle to an existing document, returned by [`DocumentStore::file_exists`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle {
    path: String,
}

impl DocumentHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Store-relative path, `/`-separated
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Document operations needed by sync
///
/// Paths are relative to the store root and use `/` separators.
pub trait DocumentStore: Send + Sync {
    /// Create a new document; fails if one already exists at `path`
    fn create_file(&self, path: &str, content: &str) -> Result<()>;

    /// Look up a document
    fn file_exists(&self, path: &str) -> Result<Option<DocumentHandle>>;

    /// Read a scalar field from a document's frontmatter
    fn frontmatter_field(&self, handle: &DocumentHandle, key: &str) -> Result<Option<String>>;

    /// Check whether a folder exists
    fn folder_exists(&self, path: &str) -> Result<bool>;

    /// Create a folder and any missing parents
    fn create_folder(&self, path: &str) -> Result<()>;
}

/// Persists settings after a sync run mutates them
pub trait SettingsStore: Send + Sync {
    fn save(&self, settings: &SyncSettings) -> Result<()>;
}
