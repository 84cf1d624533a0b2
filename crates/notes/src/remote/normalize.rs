//! Notes API response normalization
//!
//! Converts wire notes to domain models. Pure: no I/O.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

use super::api::RawNote;
use crate::models::{Note, NoteId};

/// Tag type assigned by the service to tags it generated itself
const SYSTEM_TAG: &str = "system";

/// Normalize a wire note to a domain Note
///
/// Returns `None` when the note has no usable ID; such records are skipped.
pub fn normalize_note(raw: RawNote) -> Option<Note> {
    let id = raw.id()?;

    let title = match &raw.title {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };

    let tags = raw
        .tags
        .unwrap_or_default()
        .into_iter()
        .filter(|tag| tag.kind.as_deref() != Some(SYSTEM_TAG))
        .filter_map(|tag| tag.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let source_url = raw
        .attachments
        .unwrap_or_default()
        .into_iter()
        .find_map(|a| a.url.filter(|url| !url.trim().is_empty()));

    let content = raw
        .content
        .as_deref()
        .map(html_to_markdown)
        .unwrap_or_default();

    Some(
        Note::builder(NoteId::new(id))
            .title(title)
            .content(content)
            .tags(tags)
            .created_at(raw.created_at.unwrap_or_default())
            .updated_at(raw.updated_at.unwrap_or_default())
            .source_url(source_url)
            .note_type(non_empty(raw.note_type))
            .entry_type(non_empty(raw.entry_type))
            .source(non_empty(raw.source))
            .build(),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex pattern is valid")
}

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)<br\s*/?>"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| regex(r"(?is)<h([1-6])(?:\s[^>]*)?>(.*?)</h[1-6]>"));
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)<li(?:\s[^>]*)?>"));
static BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)</(?:p|div|ul|ol|blockquote|pre|table|tr)>"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?is)<(?:b|strong)(?:\s[^>]*)?>(.*?)</(?:b|strong)>"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?is)<(?:i|em)(?:\s[^>]*)?>(.*?)</(?:i|em)>"));
static CODE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?is)<code(?:\s[^>]*)?>(.*?)</code>"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?is)<a\s[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| regex(r"<[^>]+>"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| regex(r"\n{3,}"));

/// Convert note HTML to markdown
///
/// Handles the markup the service's editor produces (paragraphs, headings,
/// lists, emphasis, code, links); anything else is reduced to its text.
pub fn html_to_markdown(html: &str) -> String {
    let mut text = LINE_BREAK.replace_all(html, "\n").into_owned();

    text = HEADING
        .replace_all(&text, |caps: &Captures| {
            let level: usize = caps[1].parse().unwrap_or(1);
            format!("\n\n{} {}\n\n", "#".repeat(level), caps[2].trim())
        })
        .into_owned();

    text = LIST_ITEM.replace_all(&text, "\n- ").into_owned();
    text = BLOCK_END.replace_all(&text, "\n\n").into_owned();
    text = BOLD.replace_all(&text, "**$1**").into_owned();
    text = ITALIC.replace_all(&text, "*$1*").into_owned();
    text = CODE.replace_all(&text, "`$1`").into_owned();
    text = LINK.replace_all(&text, "[$2]($1)").into_owned();
    text = ANY_TAG.replace_all(&text, "").into_owned();
    text = decode_html_entities(&text);

    let text = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_RUN.replace_all(&text, "\n\n").trim().to_string()
}

/// Decode HTML entities
///
/// `&amp;` goes last so already-escaped entities survive as text.
fn decode_html_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::api::{RawAttachment, RawTag};
    use serde_json::json;

    fn raw(id: Option<Value>) -> RawNote {
        RawNote {
            note_id: id,
            title: Some(json!("Title")),
            content: Some("<p>Body</p>".to_string()),
            created_at: Some("2026-01-02T03:04:05+08:00".to_string()),
            updated_at: Some("2026-01-03T03:04:05+08:00".to_string()),
            ..Default::default()
        }
    }

    fn tag(name: &str, kind: Option<&str>) -> RawTag {
        RawTag {
            name: Some(name.to_string()),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_id_is_discarded() {
        assert!(normalize_note(raw(None)).is_none());
        assert!(normalize_note(raw(Some(json!("")))).is_none());
        assert!(normalize_note(raw(Some(json!(null)))).is_none());
        assert!(normalize_note(RawNote::default()).is_none());
    }

    #[test]
    fn test_basic_fields() {
        let note = normalize_note(raw(Some(json!("n1")))).unwrap();
        assert_eq!(note.id.as_str(), "n1");
        assert_eq!(note.title, "Title");
        assert_eq!(note.content, "Body");
        assert_eq!(note.created_at, "2026-01-02T03:04:05+08:00");
        assert_eq!(note.updated_at, "2026-01-03T03:04:05+08:00");
        assert!(note.tags.is_empty());
        assert!(note.source_url.is_none());
    }

    #[test]
    fn test_title_defaults() {
        let mut note = raw(Some(json!("n1")));
        note.title = Some(json!(""));
        assert_eq!(normalize_note(note).unwrap().title, "Untitled");

        let mut note = raw(Some(json!("n1")));
        note.title = Some(json!(12));
        assert_eq!(normalize_note(note).unwrap().title, "Untitled");

        let mut note = raw(Some(json!("n1")));
        note.title = None;
        assert_eq!(normalize_note(note).unwrap().title, "Untitled");
    }

    #[test]
    fn test_system_tags_excluded() {
        let mut note = raw(Some(json!("n1")));
        note.tags = Some(vec![
            tag("reading", Some("manual")),
            tag("AI summary", Some("system")),
            tag("work", None),
            tag("  ", None),
        ]);

        let note = normalize_note(note).unwrap();
        assert_eq!(note.tags, vec!["reading".to_string(), "work".to_string()]);
    }

    #[test]
    fn test_first_attachment_url() {
        let mut note = raw(Some(json!("n1")));
        note.attachments = Some(vec![
            RawAttachment {
                kind: Some("image".to_string()),
                url: None,
            },
            RawAttachment {
                kind: Some("link".to_string()),
                url: Some("https://example.com/a".to_string()),
            },
            RawAttachment {
                kind: Some("link".to_string()),
                url: Some("https://example.com/b".to_string()),
            },
        ]);

        let note = normalize_note(note).unwrap();
        assert_eq!(note.source_url.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn test_labels_default_independently() {
        let mut note = raw(Some(json!("n1")));
        note.note_type = Some("link".to_string());
        note.entry_type = None;
        note.source = Some(String::new());

        let note = normalize_note(note).unwrap();
        assert_eq!(note.note_type, "link");
        assert_eq!(note.entry_type, "manual");
        assert_eq!(note.source, "unknown");
        assert!(note.original_content.is_none());
    }

    #[test]
    fn test_html_paragraphs_and_emphasis() {
        let html = "<p>Hello <strong>bold</strong> and <em>soft</em></p><p>Use <code>x</code></p>";
        assert_eq!(
            html_to_markdown(html),
            "Hello **bold** and *soft*\n\nUse `x`"
        );
    }

    #[test]
    fn test_html_headings_lists_links() {
        let html = r#"<h2>Plan</h2><ul><li>One</li><li><a href="https://x.test">Two</a></li></ul>"#;
        assert_eq!(
            html_to_markdown(html),
            "## Plan\n\n- One\n- [Two](https://x.test)"
        );
    }

    #[test]
    fn test_html_line_breaks_and_entities() {
        assert_eq!(
            html_to_markdown("a<br>b<br/>c &amp; d &lt;e&gt; &amp;lt;"),
            "a\nb\nc & d <e> &lt;"
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_markdown("just text"), "just text");
        assert_eq!(html_to_markdown(""), "");
    }
}
