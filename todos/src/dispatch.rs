//! The interactive context.
//!
//! All user-visible work happens on one Tokio task running an [`EventLoop`],
//! which owns the presenter. Background jobs never touch the view; they post
//! a [`MainEvent`] through a [`MainHandle`] and the loop handles it.
//!
//! # Example
//!
//! ```no_run
//! use todos::dispatch::{MainHandle, UserIntent};
//!
//! let (main, _events) = MainHandle::channel();
//! main.intent(UserIntent::Search("milk".to_string()));
//! ```

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::interactor::InteractorOutput;
use crate::presenter::{TasksPresenter, TasksRouter, TasksView};
use crate::remote::NetworkError;
use crate::types::Task;

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    /// Initial load of the screen.
    Load,
    /// Toggle completion of the visible row.
    Toggle(usize),
    /// Delete the visible row.
    Delete(usize),
    /// Open the edit surface for the visible row.
    Edit(usize),
    /// Share the visible row.
    Share(usize),
    /// Change the search text.
    Search(String),
    /// Open the edit surface for a new task.
    CreateNew,
    /// Re-run the whole fetch sequence after a failed load.
    Retry,
    /// Redraw the list.
    Refresh,
}

/// An event delivered to the interactive context.
#[derive(Debug, Clone, PartialEq)]
pub enum MainEvent {
    /// A fetch cycle produced tasks.
    TasksReceived(Vec<Task>),
    /// The initial load failed.
    FetchFailed(NetworkError),
    /// A background mutation of the authoritative collection finished.
    AuthoritativeChanged,
    /// The edit surface completed an edit.
    TaskEdited(Task),
    /// User input.
    Intent(UserIntent),
    /// Stop the loop.
    Shutdown,
}

/// Posts events to the interactive context. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MainHandle {
    events: UnboundedSender<MainEvent>,
}

impl MainHandle {
    /// Creates a handle and the receiving end for an [`EventLoop`].
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<MainEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { events }, receiver)
    }

    /// Posts `event`. Returns `false` if the loop has already stopped.
    pub fn post(&self, event: MainEvent) -> bool {
        match self.events.send(event) {
            Ok(()) => true,
            Err(e) => {
                debug!(event = ?e.0, "Interactive context closed, dropping event");
                false
            }
        }
    }

    /// Posts a user intent.
    pub fn intent(&self, intent: UserIntent) -> bool {
        self.post(MainEvent::Intent(intent))
    }

    /// Asks the loop to stop.
    pub fn shutdown(&self) -> bool {
        self.post(MainEvent::Shutdown)
    }

    /// Returns the callback the edit surface uses to complete an edit.
    #[must_use]
    pub fn edit_completion(&self) -> EditCompletion {
        EditCompletion { main: self.clone() }
    }

    /// Returns the action behind an error alert's retry button.
    #[must_use]
    pub fn retry_action(&self) -> RetryAction {
        RetryAction { main: self.clone() }
    }
}

impl InteractorOutput for MainHandle {
    fn tasks_received(&self, tasks: Vec<Task>) {
        self.post(MainEvent::TasksReceived(tasks));
    }

    fn tasks_fetch_failed(&self, error: NetworkError) {
        self.post(MainEvent::FetchFailed(error));
    }
}

/// Completes an edit by handing the edited task back to the presenter.
#[derive(Debug, Clone)]
pub struct EditCompletion {
    main: MainHandle,
}

impl EditCompletion {
    /// Delivers `task` to the interactive context.
    pub fn complete(&self, task: Task) {
        self.main.post(MainEvent::TaskEdited(task));
    }
}

/// Re-runs the fetch sequence when invoked.
#[derive(Debug, Clone)]
pub struct RetryAction {
    main: MainHandle,
}

impl RetryAction {
    /// Requests a retry.
    pub fn retry(&self) {
        self.main.intent(UserIntent::Retry);
    }
}

/// Runs the interactive context.
pub struct EventLoop<V, R> {
    presenter: TasksPresenter<V, R>,
    events: UnboundedReceiver<MainEvent>,
}

impl<V: TasksView, R: TasksRouter> EventLoop<V, R> {
    /// Creates a loop that drives `presenter` from `events`.
    pub fn new(presenter: TasksPresenter<V, R>, events: UnboundedReceiver<MainEvent>) -> Self {
        Self { presenter, events }
    }

    /// The presenter owned by this loop.
    pub fn presenter(&self) -> &TasksPresenter<V, R> {
        &self.presenter
    }

    /// Mutable access to the presenter.
    pub fn presenter_mut(&mut self) -> &mut TasksPresenter<V, R> {
        &mut self.presenter
    }

    /// Handles one event. Returns `false` when the loop should stop.
    pub fn process(&mut self, event: MainEvent) -> bool {
        trace!(?event, "Processing main event");
        let presenter = &mut self.presenter;

        match event {
            MainEvent::TasksReceived(tasks) => presenter.on_tasks_received(tasks),
            MainEvent::FetchFailed(error) => presenter.on_fetch_failed(&error),
            MainEvent::AuthoritativeChanged => presenter.on_authoritative_changed(),
            MainEvent::TaskEdited(task) => presenter.on_task_edited(task),
            MainEvent::Intent(intent) => match intent {
                UserIntent::Load => presenter.view_did_load(),
                UserIntent::Toggle(index) => presenter.toggle_completion(index),
                UserIntent::Delete(index) => presenter.delete_task(index),
                UserIntent::Edit(index) => presenter.edit_task(index),
                UserIntent::Share(index) => presenter.share_task(index),
                UserIntent::Search(text) => presenter.search(text),
                UserIntent::CreateNew => presenter.create_new_task(),
                UserIntent::Retry => presenter.retry(),
                UserIntent::Refresh => presenter.on_authoritative_changed(),
            },
            MainEvent::Shutdown => return false,
        }

        true
    }

    /// Handles every event already queued without waiting. Returns how many
    /// were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            handled += 1;
            if !self.process(event) {
                break;
            }
        }
        handled
    }

    /// Waits until no background work is pending and no event is queued.
    pub async fn settle(&mut self) {
        loop {
            let pending = self.presenter.settle();
            pending.await;
            if self.drain() == 0 {
                return;
            }
        }
    }

    /// Handles events until [`MainEvent::Shutdown`] arrives or every handle is
    /// dropped, then waits for pending background work. Returns the
    /// presenter.
    pub async fn run(mut self) -> TasksPresenter<V, R> {
        while let Some(event) = self.events.recv().await {
            if !self.process(event) {
                debug!("Event loop shutting down");
                break;
            }
        }

        let pending = self.presenter.settle();
        pending.await;
        self.presenter
    }
}
