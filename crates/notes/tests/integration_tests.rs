//! Integration tests for the notes crate
//!
//! These tests drive complete sync runs against a scripted notes service.

use anyhow::{Result, bail};
use notes::remote::HttpResponse;
use notes::storage::{
    DocumentHandle, DocumentStore, FsDocumentStore, InMemoryDocumentStore, InMemorySettingsStore,
    JsonSettingsStore, SettingsStore,
};
use notes::testing::{
    RecordingNotifier, RecordingSleeper, ScriptedTransport, list_response, list_response_with,
    token_response,
};
use notes::{
    CancelToken, NotesClient, SyncCursor, SyncError, SyncMode, SyncOutcome, SyncSettings,
    SyncStats, SyncTiming, Syncer,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Document store wrapper that can fail or cancel on specific writes
struct FlakyStore {
    inner: Arc<InMemoryDocumentStore>,
    fail_path: Option<String>,
    cancel_on_write: Option<(usize, CancelToken)>,
    writes: AtomicUsize,
}

impl FlakyStore {
    fn new(inner: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            inner,
            fail_path: None,
            cancel_on_write: None,
            writes: AtomicUsize::new(0),
        }
    }
}

impl DocumentStore for FlakyStore {
    fn create_file(&self, path: &str, content: &str) -> Result<()> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, cancel)) = &self.cancel_on_write
            && *at == n
        {
            cancel.cancel();
        }
        if self.fail_path.as_deref() == Some(path) {
            bail!("disk full");
        }
        self.inner.create_file(path, content)
    }

    fn file_exists(&self, path: &str) -> Result<Option<DocumentHandle>> {
        self.inner.file_exists(path)
    }

    fn frontmatter_field(&self, handle: &DocumentHandle, key: &str) -> Result<Option<String>> {
        self.inner.frontmatter_field(handle, key)
    }

    fn folder_exists(&self, path: &str) -> Result<bool> {
        self.inner.folder_exists(path)
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        self.inner.create_folder(path)
    }
}

struct TestEnv {
    transport: Arc<ScriptedTransport>,
    sleeper: Arc<RecordingSleeper>,
    settings_store: Arc<InMemorySettingsStore>,
    notifier: Arc<RecordingNotifier>,
    syncer: Syncer,
}

/// Helper to build a syncer over a scripted service with a working login
fn env_with_store(store: Arc<dyn DocumentStore>) -> TestEnv {
    env_with_login(store, HttpResponse::ok(token_response("access-1")))
}

fn env_with_login(store: Arc<dyn DocumentStore>, login: HttpResponse) -> TestEnv {
    let transport = Arc::new(ScriptedTransport::new());
    transport.route("/auth/refresh", login);
    let sleeper = Arc::new(RecordingSleeper::new());
    let client = NotesClient::with_transport(
        "https://api.test/v1",
        transport.clone(),
        sleeper.clone(),
        SyncTiming::default(),
    );
    let settings_store = Arc::new(InMemorySettingsStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let syncer = Syncer::new(client, store, settings_store.clone(), notifier.clone());

    TestEnv {
        transport,
        sleeper,
        settings_store,
        notifier,
        syncer,
    }
}

fn env(store: &Arc<InMemoryDocumentStore>) -> TestEnv {
    env_with_store(store.clone())
}

fn settings() -> SyncSettings {
    SyncSettings {
        refresh_token: "refresh".to_string(),
        ..SyncSettings::default()
    }
}

fn ids(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("n{}", i)).collect()
}

fn note_json(id: &str, title: &str) -> Value {
    json!({
        "note_id": id,
        "title": title,
        "content": "<p>Body</p>",
        "created_at": "2026-01-02T03:04:05Z",
        "updated_at": "2026-01-02T03:04:05Z",
    })
}

fn link_json(id: &str, title: &str) -> Value {
    let mut note = note_json(id, title);
    note["note_type"] = json!("link");
    note["attachments"] = json!([{ "type": "link", "url": "https://example.com/article" }]);
    note
}

fn run(env: &TestEnv, settings: &mut SyncSettings) -> Result<SyncStats, SyncError> {
    run_with(env, settings, &CancelToken::new())
}

fn run_with(
    env: &TestEnv,
    settings: &mut SyncSettings,
    cancel: &CancelToken,
) -> Result<SyncStats, SyncError> {
    match env.syncer.run(settings, SyncMode::Silent, cancel)? {
        SyncOutcome::Completed(stats) => Ok(stats),
        other => panic!("sync did not run: {:?}", other),
    }
}

#[test]
fn test_first_sync_writes_documents_and_cursor() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..3))));
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 3);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.errors, 0);
    assert!(!stats.cancelled);
    assert_eq!(
        store.paths(),
        vec!["Notes/Note n0.md", "Notes/Note n1.md", "Notes/Note n2.md"]
    );

    let doc = store.read("Notes/Note n0.md").unwrap();
    assert!(doc.starts_with("---\nnote_id: \"n0\"\ntitle: \"Note n0\"\n"));
    assert!(doc.contains("\n# Note n0\n\nBody of n0\n"));
    assert!(doc.contains("entry_type: \"manual\"\ntags: []\nsource: \"unknown\"\n"));

    // Cursor is the newest note and was persisted
    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("n0"));
    assert!(settings.cursor.last_sync_at.is_some());
    assert_eq!(env.settings_store.save_count(), 1);
    assert_eq!(env.settings_store.last().unwrap(), settings);
}

#[test]
fn test_standard_headers_and_access_token() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..1))));
    let mut settings = settings();

    run(&env, &mut settings).unwrap();

    let login = &env.transport.requests_to("/auth/refresh")[0];
    assert_eq!(login.body.as_deref(), Some(r#"{"refresh_token":"refresh"}"#));

    let list = &env.transport.requests_to("/notes?")[0];
    assert_eq!(list.header_value("Authorization"), Some("Bearer access-1"));
    assert_eq!(list.header_value("X-API-Version"), Some("1"));
    assert!(list.url.contains("limit=50"));
    assert!(list.url.contains("sort=create_desc"));
}

#[test]
fn test_notes_without_id_are_discarded() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    let page = vec!["n1".to_string(), String::new(), "n3".to_string()];
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&page)));
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(store.len(), 2);
    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("n1"));
}

#[test]
fn test_cursor_skips_leading_note_without_id() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    let page = vec![String::new(), "n2".to_string()];
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&page)));
    let mut settings = settings();

    run(&env, &mut settings).unwrap();

    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("n2"));
}

#[test]
fn test_no_notes_keeps_cursor_and_updates_time() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&[])));
    let mut settings = settings();
    settings.cursor = SyncCursor {
        last_synced_id: Some("old".to_string()),
        last_sync_at: None,
    };

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.pages, 1);
    assert_eq!(stats.synced + stats.skipped + stats.errors, 0);
    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("old"));
    assert!(settings.cursor.last_sync_at.is_some());
    assert_eq!(env.settings_store.save_count(), 1);
}

#[test]
fn test_second_run_stops_at_cursor() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..3))));
    let mut settings = settings();

    run(&env, &mut settings).unwrap();
    let second = run(&env, &mut settings).unwrap();

    assert_eq!(second.synced, 0);
    assert_eq!(second.skipped, 0);
    assert_eq!(store.len(), 3);
    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("n0"));
}

#[test]
fn test_rerun_without_cursor_dedups_by_note_id() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..3))));
    let mut settings = settings();

    run(&env, &mut settings).unwrap();
    settings.cursor.reset();
    let second = run(&env, &mut settings).unwrap();

    assert_eq!(second.synced, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(store.len(), 3);
}

#[test]
fn test_only_new_notes_are_written() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..4))));
    let mut settings = settings();
    settings.cursor = SyncCursor::new("n2");

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 2);
    assert_eq!(store.paths(), vec!["Notes/Note n0.md", "Notes/Note n1.md"]);
    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("n0"));
}

#[test]
fn test_multiple_pages() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..50))));
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(50..55))));
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.synced, 55);
    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("n0"));

    let lists = env.transport.requests_to("/notes?");
    assert_eq!(lists.len(), 2);
    assert!(lists[1].url.contains("since_id=n49"));
    assert_eq!(env.sleeper.slept(), vec![Duration::from_millis(500)]);
}

#[test]
fn test_stop_at_cursor_on_second_page() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..50))));
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(50..100))));
    let mut settings = settings();
    settings.cursor = SyncCursor::new("n52");

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 52);
    assert_eq!(stats.pages, 2);
    // No third page was requested
    assert_eq!(env.transport.requests_to("/notes?").len(), 2);
}

#[test]
fn test_filename_conflict_appends_id_prefix() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.insert("Notes/My Note.md", "---\nnote_id: \"abc\"\n---\n\n# My Note\n");
    let env = env(&store);
    env.transport.route(
        "/notes?",
        HttpResponse::ok(list_response_with(vec![note_json("xyz789", "My Note")])),
    );
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 1);
    assert_eq!(store.paths(), vec!["Notes/My Note-xyz789.md", "Notes/My Note.md"]);
    // The existing document is untouched
    assert!(store.read("Notes/My Note.md").unwrap().contains("note_id: \"abc\""));
}

#[test]
fn test_existing_suffixed_document_is_skipped() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.insert("Notes/My Note.md", "---\nnote_id: \"abc\"\n---\n");
    store.insert("Notes/My Note-xyz789.md", "---\nnote_id: \"xyz789abc\"\n---\n");
    let env = env(&store);
    env.transport.route(
        "/notes?",
        HttpResponse::ok(list_response_with(vec![note_json("xyz789abc", "My Note")])),
    );
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 0);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.errors, 0);
}

#[test]
fn test_link_note_includes_original_content() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport.route(
        "/notes?",
        HttpResponse::ok(list_response_with(vec![link_json("l1", "Article")])),
    );
    env.transport.route(
        "/link_detail",
        HttpResponse::ok(r#"{"success":true,"data":{"has_content":true,"content":"<p>Saved <b>text</b></p>"}}"#),
    );
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 1);
    let doc = store.read("Notes/Article.md").unwrap();
    assert!(doc.contains("note_type: \"link\"\n"));
    assert!(doc.contains("source_url: \"https://example.com/article\"\n"));
    assert!(doc.ends_with("Body\n\n> [!quote]- Original content\n> Saved **text**\n"));
    assert_eq!(env.sleeper.slept(), vec![Duration::from_millis(300)]);
}

#[test]
fn test_link_detail_failure_still_writes_note() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport.route(
        "/notes?",
        HttpResponse::ok(list_response_with(vec![link_json("l1", "Article")])),
    );
    env.transport.route("/link_detail", HttpResponse::status(404));
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 1);
    assert_eq!(stats.errors, 0);
    assert!(!store.read("Notes/Article.md").unwrap().contains("[!quote]"));
}

#[test]
fn test_cancellation_stops_after_current_note() {
    let inner = Arc::new(InMemoryDocumentStore::new());
    let cancel = CancelToken::new();
    let mut flaky = FlakyStore::new(inner.clone());
    flaky.cancel_on_write = Some((2, cancel.clone()));
    let env = env_with_store(Arc::new(flaky));
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..50))));
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(50..60))));
    let mut settings = settings();

    let stats = run_with(&env, &mut settings, &cancel).unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.synced, 2);
    assert_eq!(inner.paths(), vec!["Notes/Note n0.md", "Notes/Note n1.md"]);
    assert_eq!(env.transport.requests_to("/notes?").len(), 1);

    // Settings are persisted after a cancelled run
    assert_eq!(env.settings_store.save_count(), 1);
    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("n0"));
}

#[test]
fn test_cancelled_before_start_fetches_nothing() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..3))));
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut settings = settings();

    let stats = run_with(&env, &mut settings, &cancel).unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.synced, 0);
    assert!(env.transport.requests_to("/notes?").is_empty());
    assert!(store.is_empty());
}

#[test]
fn test_write_failure_is_isolated() {
    let inner = Arc::new(InMemoryDocumentStore::new());
    let mut flaky = FlakyStore::new(inner.clone());
    flaky.fail_path = Some("Notes/Note n1.md".to_string());
    let env = env_with_store(Arc::new(flaky));
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..3))));
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(inner.paths(), vec!["Notes/Note n0.md", "Notes/Note n2.md"]);
    assert_eq!(settings.cursor.last_synced_id.as_deref(), Some("n0"));
}

#[test]
fn test_expired_token_refreshed_mid_run() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/auth/refresh", HttpResponse::ok(token_response("access-2")));
    env.transport.route("/notes?", HttpResponse::status(401));
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..2))));
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.synced, 2);
    let lists = env.transport.requests_to("/notes?");
    assert_eq!(lists[0].header_value("Authorization"), Some("Bearer access-1"));
    assert_eq!(lists[1].header_value("Authorization"), Some("Bearer access-2"));
}

#[test]
fn test_auth_fatal_mid_run_aborts_without_saving() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    // Login works once; the mid-run refresh is rejected
    env.transport.route("/auth/refresh", HttpResponse::status(401));
    env.transport.route(
        "/notes?",
        HttpResponse::ok(list_response_with(vec![
            note_json("n0", "First"),
            link_json("l1", "Article"),
            note_json("n2", "Third"),
        ])),
    );
    env.transport.route("/link_detail", HttpResponse::status(401));
    let mut settings = settings();
    settings.cursor = SyncCursor::new("old");
    let before = settings.cursor.clone();

    let err = run(&env, &mut settings).unwrap_err();

    assert!(err.is_auth_fatal());
    assert_eq!(store.paths(), vec!["Notes/First.md"]);
    assert_eq!(settings.cursor, before);
    assert_eq!(env.settings_store.save_count(), 0);
    assert!(!env.syncer.is_syncing());
}

#[test]
fn test_list_failure_ends_run_with_error_count() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport.route("/notes?", HttpResponse::status(500));
    let mut settings = settings();

    let stats = run(&env, &mut settings).unwrap();

    assert_eq!(stats.errors, 1);
    assert_eq!(stats.synced, 0);
    // Three attempts with exponential backoff
    assert_eq!(env.transport.requests_to("/notes?").len(), 3);
    assert_eq!(
        env.sleeper.slept(),
        vec![Duration::from_millis(1000), Duration::from_millis(2000)]
    );
}

#[test]
fn test_interactive_run_reports_progress_and_summary() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env(&store);
    env.transport
        .route("/notes?", HttpResponse::ok(list_response(&ids(0..2))));
    let mut settings = settings();

    env.syncer
        .run(&mut settings, SyncMode::Interactive, &CancelToken::new())
        .unwrap();

    assert_eq!(
        env.notifier.messages(),
        vec![
            "Syncing notes: 2 synced, 0 skipped".to_string(),
            "Sync complete: 2 synced, 0 skipped, 0 errors".to_string(),
        ]
    );
}

#[test]
fn test_silent_run_does_not_notify() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let env = env_with_login(store, HttpResponse::status(401));
    let mut settings = settings();

    let err = env
        .syncer
        .run(&mut settings, SyncMode::Silent, &CancelToken::new())
        .unwrap_err();

    assert!(err.is_auth_fatal());
    assert!(env.notifier.messages().is_empty());
}

#[test]
fn test_sync_to_filesystem_vault() {
    let dir = TempDir::new().unwrap();
    let vault = Arc::new(FsDocumentStore::new(dir.path().join("vault")).unwrap());
    let settings_path = dir.path().join("settings.json");
    let settings_store = Arc::new(JsonSettingsStore::new(settings_path.clone()));

    let transport = Arc::new(ScriptedTransport::new());
    transport.route("/auth/refresh", HttpResponse::ok(token_response("access")));
    transport.route("/notes?", HttpResponse::ok(list_response(&ids(0..2))));
    let client = NotesClient::with_transport(
        "https://api.test/v1",
        transport,
        Arc::new(RecordingSleeper::new()),
        SyncTiming::default(),
    );
    let syncer = Syncer::new(
        client,
        vault.clone(),
        settings_store.clone(),
        Arc::new(RecordingNotifier::new()),
    );

    let mut settings = settings();
    settings.folder = "Inbox/Notes".to_string();
    syncer
        .run(&mut settings, SyncMode::Silent, &CancelToken::new())
        .unwrap();

    let doc = std::fs::read_to_string(vault.root().join("Inbox/Notes/Note n1.md")).unwrap();
    assert!(doc.contains("note_id: \"n1\""));

    let reloaded = settings_store.load().unwrap();
    assert_eq!(reloaded.cursor.last_synced_id.as_deref(), Some("n0"));
    assert_eq!(reloaded.folder, "Inbox/Notes");

    // Saving again goes through the same store
    settings_store.save(&reloaded).unwrap();
}
