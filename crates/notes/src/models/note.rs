//! Canonical note model produced by normalization

use serde::{Deserialize, Serialize};

/// Note kind whose body is a saved external article
pub const LINK_KIND: &str = "link";

/// Unique identifier for a note (service note ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteId(pub String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix used to disambiguate colliding filenames
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(6) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl From<String> for NoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A note in service-agnostic form, ready to be rendered to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Service note ID
    pub id: NoteId,
    /// Title (never empty)
    pub title: String,
    /// Markdown body converted from the service's HTML
    pub content: String,
    /// User tags in service order (system tags excluded)
    pub tags: Vec<String>,
    /// Creation timestamp, ISO-8601 as sent by the service
    pub created_at: String,
    /// Last update timestamp, ISO-8601 as sent by the service
    pub updated_at: String,
    /// First attachment URL, if any
    pub source_url: Option<String>,
    /// Note kind (e.g. "plain_text", "link")
    pub note_type: String,
    /// How the note was entered (e.g. "manual", "voice")
    pub entry_type: String,
    /// Client the note originated from
    pub source: String,
    /// Article content fetched separately for link notes
    pub original_content: Option<String>,
}

impl Note {
    pub const DEFAULT_TITLE: &'static str = "Untitled";
    pub const DEFAULT_NOTE_TYPE: &'static str = "plain_text";
    pub const DEFAULT_ENTRY_TYPE: &'static str = "manual";
    pub const DEFAULT_SOURCE: &'static str = "unknown";

    /// Create a new note builder
    pub fn builder(id: NoteId) -> NoteBuilder {
        NoteBuilder::new(id)
    }

    /// Whether this note needs a supplementary detail fetch
    pub fn is_link(&self) -> bool {
        self.note_type == LINK_KIND
    }
}

/// Builder for creating Note instances
pub struct NoteBuilder {
    id: NoteId,
    title: String,
    content: String,
    tags: Vec<String>,
    created_at: String,
    updated_at: String,
    source_url: Option<String>,
    note_type: Option<String>,
    entry_type: Option<String>,
    source: Option<String>,
}

impl NoteBuilder {
    fn new(id: NoteId) -> Self {
        Self {
            id,
            title: String::new(),
            content: String::new(),
            tags: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
            source_url: None,
            note_type: None,
            entry_type: None,
            source: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    pub fn updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = updated_at.into();
        self
    }

    pub fn source_url(mut self, source_url: Option<String>) -> Self {
        self.source_url = source_url;
        self
    }

    pub fn note_type(mut self, note_type: Option<String>) -> Self {
        self.note_type = note_type;
        self
    }

    pub fn entry_type(mut self, entry_type: Option<String>) -> Self {
        self.entry_type = entry_type;
        self
    }

    pub fn source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn build(self) -> Note {
        let title = if self.title.trim().is_empty() {
            Note::DEFAULT_TITLE.to_string()
        } else {
            self.title
        };

        Note {
            id: self.id,
            title,
            content: self.content,
            tags: self.tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
            source_url: self.source_url,
            note_type: self
                .note_type
                .unwrap_or_else(|| Note::DEFAULT_NOTE_TYPE.to_string()),
            entry_type: self
                .entry_type
                .unwrap_or_else(|| Note::DEFAULT_ENTRY_TYPE.to_string()),
            source: self
                .source
                .unwrap_or_else(|| Note::DEFAULT_SOURCE.to_string()),
            original_content: None,
        }
    }
}
