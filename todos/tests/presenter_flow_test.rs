//! Integration tests for the assembled task list screen.
//!
//! The screen is wired with the real reconciler, a mock HTTP endpoint and a
//! file-backed store. The event loop is driven step by step and background
//! work is awaited through `settle`, never with sleeps.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use todos::app::TasksModule;
use todos::console::{Console, ConsoleRouter, ConsoleSession};
use todos::dispatch::{MainEvent, MainHandle, UserIntent};
use todos::display::{strike_through, TaskRow};
use todos::presenter::TasksView;
use todos::remote::HttpRemoteSource;
use todos::store::{LocalStore, TaskStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

/// View that mirrors the rows it is told about.
#[derive(Default)]
struct MirrorView {
    rows: Vec<TaskRow>,
    shared: Vec<String>,
}

impl TasksView for MirrorView {
    fn reload_all(&mut self, rows: &[TaskRow]) {
        self.rows = rows.to_vec();
    }

    fn reload_row(&mut self, index: usize, row: &TaskRow) {
        self.rows[index] = row.clone();
    }

    fn row_deleted(&mut self, index: usize) {
        self.rows.remove(index);
    }

    fn show_share_sheet(&mut self, text: &str) {
        self.shared.push(text.to_string());
    }
}

type Screen = TasksModule<MirrorView, ConsoleRouter<Vec<u8>>>;

struct Harness {
    screen: Screen,
    main: MainHandle,
    console: Console,
    store: Arc<LocalStore>,
    _dir: TempDir,
}

impl Harness {
    fn new(endpoint: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::open(dir.path().join("tasks.json")).unwrap());
        let remote = Arc::new(HttpRemoteSource::new(endpoint, Duration::from_secs(5)).unwrap());
        let session = ConsoleSession::new();

        let screen = TasksModule::assemble(
            remote,
            Arc::clone(&store),
            MirrorView::default(),
            ConsoleRouter::new(Vec::new(), session.clone()),
            16,
        );
        let main = screen.handle();
        let console = Console::new(main.clone(), session);

        Self {
            screen,
            main,
            console,
            store,
            _dir: dir,
        }
    }

    async fn settle(&mut self) {
        self.screen.event_loop().settle().await;
    }

    fn process(&mut self, intent: UserIntent) {
        self.screen.event_loop().process(MainEvent::Intent(intent));
    }

    fn rows(&mut self) -> Vec<TaskRow> {
        self.screen.event_loop().presenter().view().rows.clone()
    }

    async fn loaded(endpoint: &str) -> Self {
        let mut harness = Self::new(endpoint);
        harness.main.intent(UserIntent::Load);
        harness.settle().await;
        harness
    }
}

fn todos_body() -> serde_json::Value {
    serde_json::json!({
        "todos": [
            { "todo": "Buy milk", "completed": false },
            { "todo": "Do homework", "completed": true },
            { "todo": "Call the plumber about the sink", "completed": false }
        ]
    })
}

async fn serve_todos(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(todos_body()))
        .mount(server)
        .await;
}

// =============================================================================
// Flow Tests
// =============================================================================

#[tokio::test]
async fn test_load_renders_and_persists_remote_tasks() {
    let server = MockServer::start().await;
    serve_todos(&server).await;

    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    let rows = harness.rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].title, "Buy milk...");
    assert_eq!(rows[1].title, strike_through("Do homework..."));
    assert_eq!(rows[2].title, "Call the plumber abo...");
    assert_eq!(harness.store.fetch_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_toggle_shows_immediately_then_reaches_collection_and_store() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    harness.process(UserIntent::Toggle(0));

    // Nothing has been awaited yet: only the visible row has changed.
    assert!(harness.rows()[0].completed);
    let presenter = harness.screen.event_loop().presenter();
    assert!(presenter.task_at(0).is_some_and(|t| t.is_completed));
    assert!(!presenter.all_tasks()[0].is_completed);

    harness.settle().await;

    let presenter = harness.screen.event_loop().presenter();
    assert!(presenter.all_tasks()[0].is_completed);
    let stored = harness.store.fetch_all().await.unwrap();
    assert!(stored[0].is_completed);
}

#[tokio::test]
async fn test_delete_removes_row_collection_entry_and_record() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    harness.process(UserIntent::Delete(1));
    assert_eq!(harness.rows().len(), 2);

    harness.settle().await;

    assert_eq!(harness.screen.event_loop().presenter().all_tasks().len(), 2);
    let stored = harness.store.fetch_all().await.unwrap();
    let bodies: Vec<&str> = stored.iter().map(|t| t.todo.as_str()).collect();
    assert_eq!(bodies, vec!["Buy milk", "Call the plumber about the sink"]);
}

#[tokio::test]
async fn test_search_issued_before_delete_lands_settles_on_remaining_rows() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    harness.process(UserIntent::Delete(0));
    harness.process(UserIntent::Search(String::new()));
    harness.settle().await;

    let rows = harness.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].body, "Do homework");
    assert_eq!(harness.screen.event_loop().presenter().number_of_tasks(), 2);
}

#[tokio::test]
async fn test_search_issued_before_toggle_lands_shows_toggled_row() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    harness.process(UserIntent::Toggle(0));
    harness.process(UserIntent::Search("milk".to_string()));
    harness.settle().await;

    let rows = harness.rows();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].completed);
    assert!(harness.store.fetch_all().await.unwrap()[0].is_completed);
}

#[tokio::test]
async fn test_search_filters_visible_rows_only() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    harness.console.execute_line("search HOME").unwrap();
    harness.settle().await;

    let rows = harness.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].body, "Do homework");
    assert_eq!(harness.screen.event_loop().presenter().all_tasks().len(), 3);

    harness.console.execute_line("search").unwrap();
    harness.settle().await;
    assert_eq!(harness.rows().len(), 3);
}

#[tokio::test]
async fn test_new_task_is_added_only_after_save() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    harness.console.execute_line("new").unwrap();
    harness.settle().await;
    assert_eq!(harness.rows().len(), 3);

    harness.console.execute_line("title Water plants").unwrap();
    harness.console.execute_line("body Balcony first").unwrap();
    harness.console.execute_line("save").unwrap();
    harness.settle().await;

    let rows = harness.rows();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3].title, "Water plants");
    assert_eq!(rows[3].body, "Balcony first");

    let stored = harness.store.fetch_all().await.unwrap();
    assert_eq!(stored.len(), 4);
    assert_eq!(stored[3].title, "Water plants");
}

#[tokio::test]
async fn test_edit_replaces_existing_task_everywhere() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;
    let original = harness.screen.event_loop().presenter().all_tasks()[0].clone();

    harness.console.execute_line("edit 1").unwrap();
    harness.settle().await;
    harness.console.execute_line("title Buy oat milk").unwrap();
    harness.console.execute_line("save").unwrap();
    harness.settle().await;

    let all = harness.screen.event_loop().presenter().all_tasks();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, original.id);
    assert_eq!(all[0].title, "Buy oat milk");
    assert_eq!(harness.rows()[0].title, "Buy oat milk");

    let stored = harness.store.fetch_all().await.unwrap();
    assert_eq!(stored[0].id, original.id);
    assert_eq!(stored[0].title, "Buy oat milk");
}

#[tokio::test]
async fn test_share_presents_task_text() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    harness.console.execute_line("share 1").unwrap();
    harness.settle().await;

    assert_eq!(
        harness.screen.event_loop().presenter().view().shared,
        vec!["Task: Buy milk...\nDescription: Buy milk".to_string()]
    );
}

#[tokio::test]
async fn test_failed_load_offers_retry_that_reruns_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    serve_todos(&server).await;

    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;
    assert!(harness.rows().is_empty());

    harness.console.execute_line("retry").unwrap();
    harness.settle().await;

    assert_eq!(harness.rows().len(), 3);
}

#[tokio::test]
async fn test_out_of_range_rows_are_ignored() {
    let server = MockServer::start().await;
    serve_todos(&server).await;
    let mut harness = Harness::loaded(&format!("{}/todos", server.uri())).await;

    harness.console.execute_line("toggle 9").unwrap();
    harness.console.execute_line("delete 9").unwrap();
    harness.console.execute_line("edit 9").unwrap();
    harness.settle().await;

    assert_eq!(harness.rows().len(), 3);
    assert_eq!(harness.store.fetch_all().await.unwrap().len(), 3);
}
