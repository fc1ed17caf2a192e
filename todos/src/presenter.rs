//! Presenter for the task list screen.
//!
//! The presenter keeps two collections:
//!
//! - the *authoritative* collection, every loaded task, shared with background
//!   jobs behind a mutex;
//! - the *visible* collection, the authoritative one filtered by the search
//!   text, owned by the interactive context alone.
//!
//! Row mutations (toggle, delete) are applied to the visible collection and
//! the view at once. The matching authoritative mutation is an O(n) search by
//! identifier and runs as a background job. A search or a fresh load racing
//! such a job can briefly show stale rows until the job finishes; the
//! collections are eventually consistent, not linearizable.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};
use uuid::Uuid;

use crate::background::BackgroundTasks;
use crate::detail::TaskEditor;
use crate::dispatch::{MainEvent, MainHandle, RetryAction};
use crate::display::{RowFormatter, TaskRow};
use crate::interactor::TasksInteractor;
use crate::remote::NetworkError;
use crate::types::Task;

/// Rendering port.
pub trait TasksView: Send {
    /// Replace every row.
    fn reload_all(&mut self, rows: &[TaskRow]);

    /// Replace the row at `index`.
    fn reload_row(&mut self, index: usize, row: &TaskRow);

    /// Remove the row at `index`.
    fn row_deleted(&mut self, index: usize);

    /// Present share text to the user.
    fn show_share_sheet(&mut self, text: &str);
}

/// Navigation port.
pub trait TasksRouter: Send {
    /// Present the edit surface.
    fn show_task_detail(&mut self, editor: TaskEditor);

    /// Present an error alert whose retry button invokes `retry`.
    fn show_error_alert(&mut self, message: &str, retry: RetryAction);
}

type SharedTasks = Arc<Mutex<Vec<Task>>>;

/// Presenter driving a [`TasksView`] and a [`TasksRouter`].
pub struct TasksPresenter<V, R> {
    interactor: Arc<dyn TasksInteractor>,
    view: V,
    router: R,
    main: MainHandle,
    tasks: SharedTasks,
    visible: Vec<Task>,
    search_text: String,
    rows: RowFormatter,
    background: BackgroundTasks,
}

impl<V: TasksView, R: TasksRouter> TasksPresenter<V, R> {
    /// Creates a presenter. `main` must feed the loop that owns it.
    pub fn new(interactor: Arc<dyn TasksInteractor>, view: V, router: R, main: MainHandle) -> Self {
        Self {
            interactor,
            view,
            router,
            main,
            tasks: Arc::new(Mutex::new(Vec::new())),
            visible: Vec::new(),
            search_text: String::new(),
            rows: RowFormatter::default(),
            background: BackgroundTasks::new(),
        }
    }

    /// Sets the capacity of the struck-through title cache.
    #[must_use]
    pub fn with_title_cache_size(mut self, capacity: usize) -> Self {
        self.rows = RowFormatter::new(capacity);
        self
    }

    /// Records background work in `background`.
    #[must_use]
    pub fn with_background(mut self, background: BackgroundTasks) -> Self {
        self.background = background;
        self
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Number of visible tasks.
    pub fn number_of_tasks(&self) -> usize {
        self.visible.len()
    }

    /// Visible task at `index`, if any.
    pub fn task_at(&self, index: usize) -> Option<&Task> {
        self.visible.get(index)
    }

    /// Snapshot of the authoritative collection.
    pub fn all_tasks(&self) -> Vec<Task> {
        lock(&self.tasks).clone()
    }

    /// Starts the initial load.
    pub fn view_did_load(&mut self) {
        self.interactor.fetch_tasks();
    }

    /// Re-runs the whole fetch sequence.
    pub fn retry(&mut self) {
        info!("Retrying task load");
        self.interactor.fetch_tasks();
    }

    pub fn on_tasks_received(&mut self, tasks: Vec<Task>) {
        debug!(count = tasks.len(), "Tasks received");
        *lock(&self.tasks) = tasks;
        self.refresh_visible();
        self.reload_view();
    }

    pub fn on_fetch_failed(&mut self, error: &NetworkError) {
        self.router
            .show_error_alert(&error.to_string(), self.main.retry_action());
    }

    /// Flips completion of the visible task at `index`.
    ///
    /// The row is updated immediately; the authoritative collection is
    /// updated in the background, which then asks for a refresh.
    pub fn toggle_completion(&mut self, index: usize) {
        let Some(task) = self.visible.get(index) else {
            debug!(index, "Toggle on missing row ignored");
            return;
        };

        let toggled = task.toggled();
        self.visible[index] = toggled.clone();
        let row = self.rows.row(&toggled);
        self.view.reload_row(index, &row);

        let tasks = Arc::clone(&self.tasks);
        let main = self.main.clone();
        let replacement = toggled.clone();
        self.background.spawn(async move {
            replace_by_id(&tasks, replacement);
            main.post(MainEvent::AuthoritativeChanged);
        });

        self.interactor.update_task(toggled);
    }

    /// Removes the visible task at `index`. The authoritative collection
    /// follows in the background, which then asks for a refresh.
    pub fn delete_task(&mut self, index: usize) {
        if index >= self.visible.len() {
            debug!(index, "Delete on missing row ignored");
            return;
        }

        let removed = self.visible.remove(index);
        self.view.row_deleted(index);

        let tasks = Arc::clone(&self.tasks);
        let main = self.main.clone();
        let id = removed.id;
        self.background.spawn(async move {
            remove_by_id(&tasks, id);
            main.post(MainEvent::AuthoritativeChanged);
        });

        self.interactor.delete_task(id);
    }

    /// Opens the edit surface for the visible task at `index`.
    pub fn edit_task(&mut self, index: usize) {
        if let Some(task) = self.visible.get(index) {
            let editor = TaskEditor::new(task.clone(), self.main.edit_completion());
            self.router.show_task_detail(editor);
        }
    }

    /// Opens the edit surface on a placeholder task. Nothing is added until
    /// the edit is saved.
    pub fn create_new_task(&mut self) {
        let editor = TaskEditor::new(Task::placeholder(), self.main.edit_completion());
        self.router.show_task_detail(editor);
    }

    /// Shares the visible task at `index`.
    pub fn share_task(&mut self, index: usize) {
        if let Some(task) = self.visible.get(index) {
            let text = share_text(task);
            self.view.show_share_sheet(&text);
        }
    }

    /// Applies a completed edit.
    ///
    /// The task replaces its namesake in the authoritative collection or is
    /// appended if new; the view is refreshed once that is done.
    pub fn on_task_edited(&mut self, task: Task) {
        self.interactor.save_task(task.clone());

        let tasks = Arc::clone(&self.tasks);
        let main = self.main.clone();
        self.background.spawn(async move {
            upsert(&tasks, task);
            main.post(MainEvent::AuthoritativeChanged);
        });
    }

    /// Refilters and redraws every row. Called after a background mutation
    /// finished and on explicit refresh.
    pub fn on_authoritative_changed(&mut self) {
        self.refresh_visible();
        self.reload_view();
    }

    /// Filters visible tasks by case-insensitive title substring.
    pub fn search(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.refresh_visible();
        self.reload_view();
    }

    /// Returns a future that resolves once every background job recorded
    /// by this presenter has finished. It does not borrow the presenter.
    pub fn settle(&self) -> impl Future<Output = ()> + Send + 'static {
        let background = self.background.clone();
        async move { background.settle().await }
    }

    fn refresh_visible(&mut self) {
        let needle = self.search_text.as_str();
        self.visible = lock(&self.tasks)
            .iter()
            .filter(|t| t.title_matches(needle))
            .cloned()
            .collect();
    }

    fn reload_view(&mut self) {
        let rows = self.rows.rows(&self.visible);
        self.view.reload_all(&rows);
    }
}

/// Text handed to the share sheet.
pub fn share_text(task: &Task) -> String {
    format!("Task: {}\nDescription: {}", task.title, task.todo)
}

fn lock(tasks: &SharedTasks) -> std::sync::MutexGuard<'_, Vec<Task>> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

fn replace_by_id(tasks: &SharedTasks, task: Task) {
    let mut tasks = lock(tasks);
    if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
        *slot = task;
    }
}

fn remove_by_id(tasks: &SharedTasks, id: Uuid) {
    lock(tasks).retain(|t| t.id != id);
}

fn upsert(tasks: &SharedTasks, task: Task) {
    let mut tasks = lock(tasks);
    match tasks.iter_mut().find(|t| t.id == task.id) {
        Some(slot) => *slot = task,
        None => tasks.push(task),
    }
}
