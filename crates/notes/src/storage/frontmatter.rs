//! YAML frontmatter parsing for stored documents

use serde_yaml::{Mapping, Value};

/// Parse the YAML frontmatter block at the start of a document
///
/// Returns `None` when the document has no frontmatter or it isn't a valid
/// YAML mapping.
pub fn parse_frontmatter(content: &str) -> Option<Mapping> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;

    // Find the closing ---
    let end = if rest.starts_with("---") {
        0
    } else {
        rest.find("\n---")? + 1
    };

    serde_yaml::from_str(&rest[..end]).ok()
}

/// Read a scalar frontmatter field as a string
pub fn read_field(content: &str, key: &str) -> Option<String> {
    let frontmatter = parse_frontmatter(content)?;
    match frontmatter.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
