//! Link note detail fetching

use log::warn;

use super::auth::TokenProvider;
use super::normalize::html_to_markdown;
use super::{ApiError, NotesClient};
use crate::models::NoteId;

/// Fetch the saved article of a link note as markdown
///
/// Missing content and request failures yield `Ok(None)`: the note is still
/// worth syncing without it. Only [`ApiError::AuthFatal`] is returned as an
/// error, since no further request in the run can succeed.
pub fn fetch_link_detail(
    client: &NotesClient,
    tokens: &dyn TokenProvider,
    note_id: &NoteId,
) -> Result<Option<String>, ApiError> {
    match client.get_link_detail(tokens, note_id.as_str()) {
        Ok(detail) if detail.has_content => Ok(detail
            .content
            .map(|html| html_to_markdown(&html))
            .filter(|text| !text.is_empty())),
        Ok(_) => Ok(None),
        Err(e) if e.is_auth_fatal() => Err(e),
        Err(e) => {
            warn!("Failed to fetch link detail for {}: {}", note_id.as_str(), e);
            Ok(None)
        }
    }
}
