//! Notes API HTTP client
//!
//! Builds requests for the three endpoints used by sync and routes them
//! through the [`RequestExecutor`].

use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::api::{Envelope, LinkDetail, ListNotesData, RawNote, RefreshData, RefreshRequest};
use super::auth::TokenProvider;
use super::executor::RequestExecutor;
use super::transport::{HttpRequest, HttpTransport, Sleeper, ThreadSleeper, UreqTransport};
use super::ApiError;
use crate::config::SyncTiming;

/// Notes API client
pub struct NotesClient {
    base_url: String,
    executor: RequestExecutor,
}

impl NotesClient {
    /// Notes per list request; a shorter page is the last one
    pub const PAGE_SIZE: usize = 50;

    /// Required by the service; requests without it get a 403
    const API_VERSION: &'static str = "1";

    /// Newest-first ordering for the list endpoint
    const SORT_NEWEST_FIRST: &'static str = "create_desc";

    const USER_AGENT: &'static str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    /// Create a client using the real HTTP transport
    pub fn new(base_url: impl Into<String>, timing: SyncTiming) -> Self {
        Self::with_transport(
            base_url,
            Arc::new(UreqTransport::new()),
            Arc::new(ThreadSleeper),
            timing,
        )
    }

    /// Create a client over an arbitrary transport and sleeper
    pub fn with_transport(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        timing: SyncTiming,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            executor: RequestExecutor::new(transport, sleeper, timing),
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Exchange a refresh token for an access token
    ///
    /// Not subject to the refresh-on-401 path; a rejection here is returned
    /// as a plain HTTP error for the caller to classify.
    pub fn exchange_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let body = serde_json::to_string(&RefreshRequest { refresh_token })
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let request = self.with_standard_headers(HttpRequest::post(
            format!("{}/auth/refresh", self.base_url),
            body,
        ));

        let response = self.executor.execute(&request, None)?;
        let envelope: Envelope<RefreshData> = decode(&response.body)?;

        if envelope.success != Some(true) {
            return Err(ApiError::AuthFatal(
                envelope
                    .message
                    .unwrap_or_else(|| "token exchange rejected".to_string()),
            ));
        }

        envelope
            .data
            .and_then(|d| d.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::AuthFatal("token exchange returned no token".to_string()))
    }

    /// List one page of notes, newest first
    ///
    /// # Arguments
    /// * `tokens` - Access token source, refreshed on 401/403
    /// * `since_id` - ID of the oldest note of the previous page (None for the first page)
    pub fn list_notes(
        &self,
        tokens: &dyn TokenProvider,
        since_id: Option<&str>,
    ) -> Result<Vec<RawNote>, ApiError> {
        let limit = Self::PAGE_SIZE.to_string();
        let url = url::Url::parse_with_params(
            &format!("{}/notes", self.base_url),
            &[
                ("limit", limit.as_str()),
                ("since_id", since_id.unwrap_or("")),
                ("sort", Self::SORT_NEWEST_FIRST),
            ],
        )
        .map_err(|e| ApiError::Decode(format!("invalid base URL: {}", e)))?;

        let request = self.authorized(HttpRequest::get(url.as_str()), tokens);
        let response = self.executor.execute(&request, Some(tokens))?;
        let envelope: Envelope<ListNotesData> = decode(&response.body)?;

        Ok(envelope
            .data
            .unwrap_or_default()
            .list
            .into_iter()
            .map(RawNote::from_value)
            .collect())
    }

    /// Get the saved article for a link note
    pub fn get_link_detail(
        &self,
        tokens: &dyn TokenProvider,
        note_id: &str,
    ) -> Result<LinkDetail, ApiError> {
        let url = format!(
            "{}/notes/{}/link_detail",
            self.base_url,
            urlencoding::encode(note_id)
        );

        let request = self.authorized(HttpRequest::get(url), tokens);
        let response = self.executor.execute(&request, Some(tokens))?;
        let envelope: Envelope<LinkDetail> = decode(&response.body)?;

        Ok(envelope.data.unwrap_or_default())
    }

    fn with_standard_headers(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("X-API-Version", Self::API_VERSION)
            .header("Content-Type", "application/json")
            .header("User-Agent", Self::USER_AGENT)
    }

    fn authorized(&self, request: HttpRequest, tokens: &dyn TokenProvider) -> HttpRequest {
        self.with_standard_headers(request)
            .with_bearer(&tokens.access_token())
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::transport::HttpResponse;
    use crate::testing::{RecordingSleeper, ScriptedTransport, StaticTokens};

    fn client(transport: &Arc<ScriptedTransport>) -> NotesClient {
        NotesClient::with_transport(
            "https://api.test/v1/",
            transport.clone(),
            Arc::new(RecordingSleeper::new()),
            SyncTiming::default(),
        )
    }

    #[test]
    fn test_list_notes_request_shape() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::ok(r#"{"success":true,"data":{"list":[]}}"#));
        let tokens = StaticTokens::new("access", Ok("unused".into()));

        let notes = client(&transport).list_notes(&tokens, Some("n 9")).unwrap();

        assert!(notes.is_empty());
        let request = &transport.requests()[0];
        assert_eq!(
            request.url,
            "https://api.test/v1/notes?limit=50&since_id=n+9&sort=create_desc"
        );
        assert_eq!(request.header_value("Authorization"), Some("Bearer access"));
        assert_eq!(request.header_value("X-API-Version"), Some("1"));
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));
        assert!(request.header_value("User-Agent").unwrap().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_list_notes_first_page_sends_empty_since_id() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::ok(r#"{"data":{"list":[]}}"#));
        let tokens = StaticTokens::new("access", Ok("unused".into()));

        client(&transport).list_notes(&tokens, None).unwrap();

        assert!(transport.requests()[0].url.contains("since_id=&"));
    }

    #[test]
    fn test_list_notes_tolerates_malformed_items() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::ok(
            r#"{"data":{"list":[{"note_id":"a","title":"A"},{"note_id":"b","tags":"oops"},{"note_id":42}]}}"#,
        ));
        let tokens = StaticTokens::new("access", Ok("unused".into()));

        let notes = client(&transport).list_notes(&tokens, None).unwrap();

        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].id().as_deref(), Some("a"));
        assert_eq!(notes[1].id(), None);
        assert_eq!(notes[2].id().as_deref(), Some("42"));
    }

    #[test]
    fn test_list_notes_invalid_json_is_decode_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::ok("<html>maintenance</html>"));
        let tokens = StaticTokens::new("access", Ok("unused".into()));

        let err = client(&transport).list_notes(&tokens, None).unwrap_err();

        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_link_detail_encodes_id() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::ok(
            r#"{"success":true,"data":{"has_content":true,"content":"<p>Body</p>"}}"#,
        ));
        let tokens = StaticTokens::new("access", Ok("unused".into()));

        let detail = client(&transport).get_link_detail(&tokens, "a/b").unwrap();

        assert!(detail.has_content);
        assert_eq!(detail.content.as_deref(), Some("<p>Body</p>"));
        assert_eq!(
            transport.requests()[0].url,
            "https://api.test/v1/notes/a%2Fb/link_detail"
        );
    }

    #[test]
    fn test_exchange_token_sends_standard_headers() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(HttpResponse::ok(r#"{"success":true,"data":{"token":"t"}}"#));

        let token = client(&transport).exchange_token("rt").unwrap();

        assert_eq!(token, "t");
        let request = &transport.requests()[0];
        assert_eq!(request.header_value("X-API-Version"), Some("1"));
        assert_eq!(request.header_value("Authorization"), None);
        assert_eq!(request.body.as_deref(), Some(r#"{"refresh_token":"rt"}"#));
    }
}
