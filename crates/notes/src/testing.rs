//! Test doubles for the transport, clock and notification seams
//!
//! Shared by unit tests and the integration tests under `tests/`.

use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::remote::{ApiError, HttpRequest, HttpResponse, HttpTransport, Sleeper, TokenProvider};
use crate::sync::Notifier;

type Scripted = Result<HttpResponse, ApiError>;

/// Transport that replays queued responses and records every request
///
/// Requests whose URL contains a routed fragment are served from that
/// route's queue; everything else from the default queue. Once a queue is
/// down to its last response, that response is repeated.
#[derive(Default)]
pub struct ScriptedTransport {
    default: Mutex<VecDeque<Scripted>>,
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response on the default queue
    pub fn push(&self, response: HttpResponse) {
        self.default.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a transport failure on the default queue
    pub fn push_error(&self, error: ApiError) {
        self.default.lock().unwrap().push_back(Err(error));
    }

    /// Queue a response for requests whose URL contains `fragment`
    pub fn route(&self, fragment: &str, response: HttpResponse) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|(f, _)| f == fragment) {
            Some((_, queue)) => queue.push_back(Ok(response)),
            None => routes.push((fragment.to_string(), VecDeque::from([Ok(response)]))),
        }
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose URL contains `fragment`
    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.contains(fragment))
            .collect()
    }

    fn next_from(queue: &mut VecDeque<Scripted>) -> Scripted {
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(no_response)
        } else {
            queue.front().cloned().unwrap_or_else(no_response)
        }
    }
}

fn no_response() -> Scripted {
    Err(ApiError::Network("no scripted response".to_string()))
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        if let Some((_, queue)) = routes.iter_mut().find(|(f, _)| request.url.contains(f.as_str())) {
            return Self::next_from(queue);
        }
        drop(routes);

        Self::next_from(&mut self.default.lock().unwrap())
    }
}

/// Sleeper that records requested delays and returns immediately
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.slept().into_iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Token provider with a fixed access token and a canned refresh result
pub struct StaticTokens {
    access: Mutex<String>,
    refresh_result: Result<String, ApiError>,
    refresh_calls: AtomicU32,
}

impl StaticTokens {
    pub fn new(access: &str, refresh_result: Result<String, ApiError>) -> Self {
        Self {
            access: Mutex::new(access.to_string()),
            refresh_result,
            refresh_calls: AtomicU32::new(0),
        }
    }

    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

impl TokenProvider for StaticTokens {
    fn access_token(&self) -> String {
        self.access.lock().unwrap().clone()
    }

    fn refresh(&self) -> Result<String, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let token = self.refresh_result.clone()?;
        *self.access.lock().unwrap() = token.clone();
        Ok(token)
    }
}

/// Notifier that keeps every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Body of a successful list response holding one plain note per ID
///
/// An empty ID produces a note without a `note_id` field.
pub fn list_response(ids: &[String]) -> String {
    let list: Vec<Value> = ids
        .iter()
        .map(|id| {
            let mut note = json!({
                "title": format!("Note {}", id),
                "content": format!("<p>Body of {}</p>", id),
                "created_at": "2026-01-02T03:04:05Z",
                "updated_at": "2026-01-02T03:04:05Z",
            });
            if !id.is_empty() {
                note["note_id"] = json!(id);
            }
            note
        })
        .collect();

    list_response_with(list)
}

/// Body of a successful list response holding the given raw notes
pub fn list_response_with(notes: Vec<Value>) -> String {
    json!({ "success": true, "data": { "list": notes } }).to_string()
}

/// Body of a successful token exchange
pub fn token_response(token: &str) -> String {
    json!({ "success": true, "data": { "token": token } }).to_string()
}
