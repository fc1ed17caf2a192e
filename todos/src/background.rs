//! Tracking for fire-and-forget background work.
//!
//! Persistence writes and authoritative-collection mutations run on the
//! worker pool without anyone awaiting them. [`BackgroundTasks`] keeps their
//! join handles so that shutdown and tests can wait for them with
//! [`settle`](BackgroundTasks::settle) instead of sleeping.

use std::future::Future;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::error;

/// A shared set of spawned background jobs.
///
/// Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `job` on the runtime and records it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(job);

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of recorded jobs that have not finished yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Waits until every recorded job has finished, including jobs that were
    /// spawned while waiting.
    pub async fn settle(&self) {
        loop {
            let handles = mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
            if handles.is_empty() {
                return;
            }

            for result in join_all(handles).await {
                if let Err(e) = result {
                    if e.is_panic() {
                        error!(error = %e, "Background job panicked");
                    }
                }
            }
        }
    }
}
