//! Row formatting for the task list.
//!
//! The view receives ready-made [`TaskRow`]s. Completed titles are struck
//! through with a combining overlay; since the same titles are rendered again
//! on every reload, the struck strings are memoized in a bounded LRU cache
//! owned by the formatter (one per presenter, never process-wide).

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::types::Task;

/// Default number of struck-through titles kept in the cache.
pub const DEFAULT_TITLE_CACHE_SIZE: usize = 256;

/// Combining long stroke overlay (U+0336).
const STRIKE_OVERLAY: char = '\u{0336}';

/// A task as displayed in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    /// Title, struck through when the task is completed.
    pub title: String,

    /// Task body.
    pub body: String,

    /// Creation date as `dd/MM/yy`.
    pub date: String,

    /// Completion flag.
    pub completed: bool,
}

/// Builds [`TaskRow`]s, caching struck-through titles by title text.
#[derive(Debug)]
pub struct RowFormatter {
    struck_titles: LruCache<String, String>,
}

impl Default for RowFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_CACHE_SIZE)
    }
}

impl RowFormatter {
    /// Creates a formatter whose cache holds up to `capacity` titles. A zero
    /// capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            struck_titles: LruCache::new(capacity),
        }
    }

    /// Formats one task.
    pub fn row(&mut self, task: &Task) -> TaskRow {
        let title = if task.is_completed {
            self.struck(&task.title)
        } else {
            task.title.clone()
        };

        TaskRow {
            title,
            body: task.todo.clone(),
            date: task.display_date(),
            completed: task.is_completed,
        }
    }

    /// Formats a slice of tasks, preserving order.
    pub fn rows(&mut self, tasks: &[Task]) -> Vec<TaskRow> {
        tasks.iter().map(|t| self.row(t)).collect()
    }

    /// Number of cached titles.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.struck_titles.len()
    }

    fn struck(&mut self, title: &str) -> String {
        if let Some(cached) = self.struck_titles.get(title) {
            return cached.clone();
        }

        let struck = strike_through(title);
        self.struck_titles.put(title.to_string(), struck.clone());
        struck
    }
}

/// Strikes through `text` by following every character with U+0336.
#[must_use]
pub fn strike_through(text: &str) -> String {
    text.chars().flat_map(|c| [c, STRIKE_OVERLAY]).collect()
}
