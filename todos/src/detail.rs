//! Edit surface model.
//!
//! A [`TaskEditor`] holds a draft of one task. Saving hands the draft back to
//! the interactive context; cancelling drops it.

use tracing::debug;

use crate::dispatch::EditCompletion;
use crate::types::Task;

/// Draft of a task being edited.
///
/// Only the title and body can change. The identifier, creation timestamp
/// and completion flag are carried through untouched.
#[derive(Debug)]
pub struct TaskEditor {
    draft: Task,
    completion: EditCompletion,
}

impl TaskEditor {
    /// Opens an editor on `task`.
    pub fn new(task: Task, completion: EditCompletion) -> Self {
        Self {
            draft: task,
            completion,
        }
    }

    /// The task as it is being edited.
    pub fn draft(&self) -> &Task {
        &self.draft
    }

    pub fn title(&self) -> &str {
        &self.draft.title
    }

    pub fn body(&self) -> &str {
        &self.draft.todo
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.draft.todo = body.into();
    }

    /// Completes the edit and returns the saved task.
    pub fn save(self) -> Task {
        debug!(id = %self.draft.id, "Task edit saved");
        self.completion.complete(self.draft.clone());
        self.draft
    }

    /// Discards the draft.
    pub fn cancel(self) {
        debug!(id = %self.draft.id, "Task edit cancelled");
    }
}
