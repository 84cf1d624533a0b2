//! Notes service integration
//!
//! This module provides:
//! - A resilient request executor (retry, backoff, token refresh)
//! - The notes API client and token session
//! - Lazy note pagination and link detail fetching
//! - Response normalization to domain models

mod auth;
mod client;
mod detail;
mod error;
mod executor;
mod normalize;
mod pages;
mod transport;

pub use auth::{Session, TokenProvider};
pub use client::NotesClient;
pub use detail::fetch_link_detail;
pub use error::{ApiError, is_auth_fatal};
pub use executor::RequestExecutor;
pub use normalize::{html_to_markdown, normalize_note};
pub use pages::{NotePages, Page};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, Sleeper, ThreadSleeper, UreqTransport,
};

/// Notes API wire types
pub mod api {
    use log::debug;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    /// Common response envelope
    #[derive(Debug, Deserialize)]
    pub struct Envelope<T> {
        #[serde(default)]
        pub success: Option<bool>,
        pub data: Option<T>,
        pub message: Option<String>,
    }

    /// Payload of the list endpoint
    ///
    /// Items stay untyped until [`RawNote::from_value`] so one malformed
    /// note cannot fail the whole page.
    #[derive(Debug, Default, Deserialize)]
    pub struct ListNotesData {
        #[serde(default)]
        pub list: Vec<Value>,
    }

    /// Note as listed by the service
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    pub struct RawNote {
        pub note_id: Option<Value>,
        pub title: Option<Value>,
        /// HTML body
        pub content: Option<String>,
        pub tags: Option<Vec<RawTag>>,
        pub attachments: Option<Vec<RawAttachment>>,
        pub note_type: Option<String>,
        pub entry_type: Option<String>,
        pub source: Option<String>,
        pub created_at: Option<String>,
        pub updated_at: Option<String>,
    }

    impl RawNote {
        /// Decode one list item; undecodable items become an empty note
        pub fn from_value(value: Value) -> Self {
            serde_json::from_value(value).unwrap_or_else(|e| {
                debug!("Undecodable note in list response: {}", e);
                Self::default()
            })
        }

        /// Note ID as a string, if present and non-empty
        pub fn id(&self) -> Option<String> {
            match self.note_id.as_ref()? {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        }
    }

    /// Tag attached to a note
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    pub struct RawTag {
        pub name: Option<String>,
        /// "system" for tags generated by the service itself
        #[serde(rename = "type")]
        pub kind: Option<String>,
    }

    /// Attachment reference on a note
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    pub struct RawAttachment {
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub url: Option<String>,
    }

    /// Payload of the link detail endpoint
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct LinkDetail {
        pub has_content: bool,
        /// HTML of the saved article
        pub content: Option<String>,
    }

    /// Body of the token exchange request
    #[derive(Debug, Serialize)]
    pub struct RefreshRequest<'a> {
        pub refresh_token: &'a str,
    }

    /// Payload of the token exchange response
    #[derive(Debug, Deserialize)]
    pub struct RefreshData {
        pub token: Option<String>,
    }
}
