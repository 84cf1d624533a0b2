//! Local filesystem document store
//!
//! Directory structure mirrors store paths under a vault root:
//! ```text
//! vault/
//!   Notes/
//!     Weekly plan.md
//!     Weekly plan-xyz789.md
//! ```

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::frontmatter::read_field;
use super::traits::{DocumentHandle, DocumentStore};

/// Document store backed by a directory on disk
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create vault directory: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the filesystem, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("Path escapes the vault: {}", path),
            }
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentStore for FsDocumentStore {
    fn create_file(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path)?;
        if full.exists() {
            bail!("Document already exists: {}", path);
        }

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically (write to temp, then rename)
        let temp_path = full.with_extension("md.tmp");
        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write document: {}", path))?;
        fs::rename(&temp_path, &full)
            .with_context(|| format!("Failed to move document into place: {}", path))?;

        Ok(())
    }

    fn file_exists(&self, path: &str) -> Result<Option<DocumentHandle>> {
        let full = self.resolve(path)?;
        Ok(full.is_file().then(|| DocumentHandle::new(path)))
    }

    fn frontmatter_field(&self, handle: &DocumentHandle, key: &str) -> Result<Option<String>> {
        let full = self.resolve(handle.path())?;
        let content = fs::read_to_string(&full)
            .with_context(|| format!("Failed to read document: {}", handle.path()))?;
        Ok(read_field(&content, key))
    }

    fn folder_exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path)?.is_dir())
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        fs::create_dir_all(&full)
            .with_context(|| format!("Failed to create folder: {}", path))
    }
}
