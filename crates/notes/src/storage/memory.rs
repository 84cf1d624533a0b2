//! In-memory document store
//!
//! Used for testing and by hosts that keep documents in their own
//! structures.

use anyhow::{Result, bail};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use super::frontmatter::read_field;
use super::traits::{DocumentHandle, DocumentStore};

/// In-memory implementation of DocumentStore
///
/// Documents are kept in path order so listings are deterministic.
pub struct InMemoryDocumentStore {
    files: RwLock<BTreeMap<String, String>>,
    folders: RwLock<BTreeSet<String>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            folders: RwLock::new(BTreeSet::new()),
        }
    }

    /// Put a document in place, replacing any existing one
    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files
            .write()
            .unwrap()
            .insert(path.into(), content.into());
    }

    /// Read a document's full content
    pub fn read(&self, path: &str) -> Option<String> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// All document paths, sorted
    pub fn paths(&self) -> Vec<String> {
        self.files.read().unwrap().keys().cloned().collect()
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.files.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn create_file(&self, path: &str, content: &str) -> Result<()> {
        let mut files = self.files.write().unwrap();
        if files.contains_key(path) {
            bail!("Document already exists: {}", path);
        }
        files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn file_exists(&self, path: &str) -> Result<Option<DocumentHandle>> {
        let files = self.files.read().unwrap();
        Ok(files.contains_key(path).then(|| DocumentHandle::new(path)))
    }

    fn frontmatter_field(&self, handle: &DocumentHandle, key: &str) -> Result<Option<String>> {
        let files = self.files.read().unwrap();
        match files.get(handle.path()) {
            Some(content) => Ok(read_field(content, key)),
            None => bail!("Document not found: {}", handle.path()),
        }
    }

    fn folder_exists(&self, path: &str) -> Result<bool> {
        Ok(self.folders.read().unwrap().contains(path))
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        let mut folders = self.folders.write().unwrap();
        // Record every ancestor, like create_dir_all
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);
            folders.insert(current.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_read() {
        let store = InMemoryDocumentStore::new();
        store.create_file("Notes/a.md", "---\nnote_id: \"n1\"\n---\n").unwrap();

        let handle = store.file_exists("Notes/a.md").unwrap().unwrap();
        assert_eq!(
            store.frontmatter_field(&handle, "note_id").unwrap().as_deref(),
            Some("n1")
        );
        assert_eq!(store.len(), 1);
        assert!(store.file_exists("Notes/b.md").unwrap().is_none());
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let store = InMemoryDocumentStore::new();
        store.create_file("a.md", "one").unwrap();
        assert!(store.create_file("a.md", "two").is_err());
        assert_eq!(store.read("a.md").as_deref(), Some("one"));
    }

    #[test]
    fn test_create_folder_records_ancestors() {
        let store = InMemoryDocumentStore::new();
        assert!(!store.folder_exists("Notes").unwrap());

        store.create_folder("Notes/Inbox").unwrap();

        assert!(store.folder_exists("Notes").unwrap());
        assert!(store.folder_exists("Notes/Inbox").unwrap());
    }

    #[test]
    fn test_paths_sorted() {
        let store = InMemoryDocumentStore::new();
        store.insert("b.md", "");
        store.insert("a.md", "");
        assert_eq!(store.paths(), vec!["a.md".to_string(), "b.md".to_string()]);
    }
}
