//! Task types shared by every layer of the application.
//!
//! [`Task`] is the immutable value passed between the remote source, the local
//! store, the reconciler and the presenter. Mutations never edit a task in
//! place; they produce a new value that replaces the old one by identifier.
//!
//! The remote endpoint only ships a body and a completion flag per task, so
//! [`RemoteTask`] and [`RemoteTaskList`] describe that reduced wire shape and
//! [`Task::from_remote`] fills in the rest client-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of body characters kept when deriving a title.
pub const TITLE_PREFIX_LEN: usize = 20;

/// Marker appended to derived titles.
pub const TITLE_ELLIPSIS: &str = "...";

/// Title given to a task created from the "new task" action.
pub const PLACEHOLDER_TITLE: &str = "Title";

/// Body given to a task created from the "new task" action.
pub const PLACEHOLDER_BODY: &str = "Description";

/// Format used when showing a task's creation date.
const DISPLAY_DATE_FORMAT: &str = "%d/%m/%y";

/// A single to-do entry.
///
/// The identifier and creation timestamp are fixed at construction. Every
/// other field changes only by building a replacement value, see
/// [`Task::toggled`] and [`Task::with_content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable identifier, generated client-side.
    pub id: Uuid,

    /// When the task was first created or hydrated.
    pub created_at: DateTime<Utc>,

    /// Short headline shown in the list.
    pub title: String,

    /// Free-text body.
    pub todo: String,

    /// Whether the task is done.
    pub is_completed: bool,
}

impl Task {
    /// Creates a new, not completed task with a fresh identifier and the
    /// current time as creation timestamp.
    ///
    /// # Examples
    ///
    /// ```
    /// use todos::types::Task;
    ///
    /// let task = Task::new("Groceries", "Buy milk");
    /// assert_eq!(task.title, "Groceries");
    /// assert!(!task.is_completed);
    /// ```
    #[must_use]
    pub fn new(title: impl Into<String>, todo: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            title: title.into(),
            todo: todo.into(),
            is_completed: false,
        }
    }

    /// Creates the placeholder task handed to the edit surface when the user
    /// asks for a new task.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_TITLE, PLACEHOLDER_BODY)
    }

    /// Hydrates a task from its wire representation.
    ///
    /// The wire format carries no identifier, title or timestamp: the
    /// identifier is freshly generated, the timestamp is "now" and the title
    /// is derived from the body with [`derive_title`].
    #[must_use]
    pub fn from_remote(remote: RemoteTask) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            title: derive_title(&remote.todo),
            todo: remote.todo,
            is_completed: remote.completed,
        }
    }

    /// Returns a copy with the completion flag flipped.
    #[must_use]
    pub fn toggled(&self) -> Self {
        Self {
            is_completed: !self.is_completed,
            ..self.clone()
        }
    }

    /// Returns a copy with a new title and body. Identity is preserved.
    #[must_use]
    pub fn with_content(&self, title: impl Into<String>, todo: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            todo: todo.into(),
            ..self.clone()
        }
    }

    /// Case-insensitive substring match against the title.
    ///
    /// An empty needle matches every task.
    #[must_use]
    pub fn title_matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.title.to_lowercase().contains(&needle.to_lowercase())
    }

    /// Creation date formatted as `dd/MM/yy`.
    #[must_use]
    pub fn display_date(&self) -> String {
        self.created_at.format(DISPLAY_DATE_FORMAT).to_string()
    }
}

/// Derives a list title from a task body: the first [`TITLE_PREFIX_LEN`]
/// characters followed by [`TITLE_ELLIPSIS`].
///
/// # Examples
///
/// ```
/// use todos::types::derive_title;
///
/// assert_eq!(
///     derive_title("This is a very long task description"),
///     "This is a very long ..."
/// );
/// assert_eq!(derive_title("Buy milk"), "Buy milk...");
/// ```
#[must_use]
pub fn derive_title(body: &str) -> String {
    let prefix: String = body.chars().take(TITLE_PREFIX_LEN).collect();
    format!("{prefix}{TITLE_ELLIPSIS}")
}

/// One element of the remote task list.
///
/// Unknown fields (numeric ids, user ids) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTask {
    /// Free-text body.
    pub todo: String,

    /// Completion flag.
    pub completed: bool,
}

/// Top-level object returned by the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTaskList {
    /// The task list field.
    pub todos: Vec<RemoteTask>,
}

impl RemoteTaskList {
    /// Hydrates every element into a [`Task`], preserving order.
    #[must_use]
    pub fn into_tasks(self) -> Vec<Task> {
        self.todos.into_iter().map(Task::from_remote).collect()
    }
}
