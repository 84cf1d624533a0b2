//! Lazy pagination over the notes list
//!
//! Pages are fetched one at a time as the consumer pulls them. The cursor
//! for the next page is the ID of the oldest (last) note of the current one.

use log::{debug, warn};

use super::api::RawNote;
use super::auth::TokenProvider;
use super::{ApiError, NotesClient};
use crate::cancel::CancelToken;

/// One batch of notes, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub notes: Vec<RawNote>,
    /// Fewer notes than the page size were returned
    pub is_last_page: bool,
}

/// Iterator over note pages
///
/// Yields `Err` at most once, after which the sequence ends. Cancellation is
/// checked before every request.
pub struct NotePages<'a> {
    client: &'a NotesClient,
    tokens: &'a dyn TokenProvider,
    cancel: &'a CancelToken,
    since_id: Option<String>,
    started: bool,
    finished: bool,
}

impl<'a> NotePages<'a> {
    pub fn new(
        client: &'a NotesClient,
        tokens: &'a dyn TokenProvider,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            client,
            tokens,
            cancel,
            since_id: None,
            started: false,
            finished: false,
        }
    }

    /// Cursor that will be sent with the next request
    pub fn since_id(&self) -> Option<&str> {
        self.since_id.as_deref()
    }
}

impl Iterator for NotePages<'_> {
    type Item = Result<Page, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.started {
            let executor = self.client.executor();
            executor.pause(executor.timing().page_delay);
        }

        if self.cancel.is_cancelled() {
            debug!("Pagination cancelled before next page");
            self.finished = true;
            return None;
        }
        self.started = true;

        let notes = match self.client.list_notes(self.tokens, self.since_id.as_deref()) {
            Ok(notes) => notes,
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        let mut is_last_page = notes.len() < NotesClient::PAGE_SIZE;
        if !is_last_page {
            // Items without an ID can't serve as a cursor; fall back to the
            // nearest one before them.
            match notes.iter().rev().find_map(RawNote::id) {
                Some(id) => self.since_id = Some(id),
                None => {
                    warn!("Full page without any note IDs; stopping pagination");
                    is_last_page = true;
                }
            }
        }

        if is_last_page {
            self.finished = true;
        }

        debug!(
            "Fetched page of {} notes (last: {})",
            notes.len(),
            is_last_page
        );

        Some(Ok(Page {
            notes,
            is_last_page,
        }))
    }
}
