//! Document rendering and file naming
//!
//! Each note becomes one markdown document: YAML frontmatter with a fixed
//! key order, a heading, the body, and for link notes a collapsed callout
//! holding the original article.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Note;

/// Frontmatter key holding the note ID; dedup reads it back
pub const NOTE_ID_FIELD: &str = "note_id";

/// Maximum filename length in characters, extension excluded
const MAX_FILENAME_CHARS: usize = 200;

/// Characters that are illegal in filenames on at least one platform
const ILLEGAL_FILENAME_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>', '\0'];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex pattern is valid"));

/// Render a note as a markdown document
pub fn render_document(note: &Note) -> String {
    let mut doc = String::new();

    doc.push_str("---\n");
    push_field(&mut doc, NOTE_ID_FIELD, note.id.as_str());
    push_field(&mut doc, "title", &note.title);
    push_field(&mut doc, "note_type", &note.note_type);
    push_field(&mut doc, "entry_type", &note.entry_type);
    if note.tags.is_empty() {
        doc.push_str("tags: []\n");
    } else {
        doc.push_str("tags:\n");
        for tag in &note.tags {
            doc.push_str(&format!("  - \"{}\"\n", escape_yaml_value(tag)));
        }
    }
    if let Some(url) = &note.source_url {
        push_field(&mut doc, "source_url", url);
    }
    push_field(&mut doc, "source", &note.source);
    push_field(&mut doc, "created_at", &note.created_at);
    push_field(&mut doc, "updated_at", &note.updated_at);
    doc.push_str("---\n\n");

    doc.push_str(&format!("# {}\n\n", single_line(&note.title)));

    if !note.content.is_empty() {
        doc.push_str(&note.content);
        doc.push('\n');
    }

    if let Some(original) = &note.original_content {
        doc.push_str("\n> [!quote]- Original content\n");
        for line in original.lines() {
            if line.is_empty() {
                doc.push_str(">\n");
            } else {
                doc.push_str(&format!("> {}\n", line));
            }
        }
    }

    doc
}

fn push_field(doc: &mut String, key: &str, value: &str) {
    doc.push_str(&format!("{}: \"{}\"\n", key, escape_yaml_value(value)));
}

/// Make a value safe inside a double-quoted YAML scalar
///
/// Line breaks, tabs and the Unicode line/paragraph separators become
/// spaces; other control characters are dropped; `\` and `"` are escaped.
pub fn escape_yaml_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' | '\r' | '\t' | '\u{2028}' | '\u{2029}' => out.push(' '),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Collapse internal line breaks so a title fits a heading line
fn single_line(title: &str) -> String {
    title
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a note title into a safe filename (without extension)
pub fn sanitize_filename(title: &str) -> String {
    let stripped: String = title
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect();
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let name: String = collapsed
        .trim()
        .trim_start_matches('.')
        .trim()
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();
    let name = name.trim_end();

    if name.is_empty() {
        Note::DEFAULT_TITLE.to_string()
    } else {
        name.to_string()
    }
}

/// Store path for a document named `name` in `folder`
pub fn document_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("{}.md", name)
    } else {
        format!("{}/{}.md", folder, name)
    }
}
