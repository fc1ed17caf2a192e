//! Reconciler between the local store and the remote source.
//!
//! A fetch cycle reads the local store first and only falls back to the
//! remote source when the store is empty (or unreadable):
//!
//! ```text
//! Idle -> LocalRead -> LocalHit                      -> Done
//!                   -> LocalMiss -> RemoteRead -> RemoteSuccess -> persist, Done
//!                                             -> RemoteFailure -> reported
//! ```
//!
//! Only a failed remote read is reported to the output. Store failures during
//! the cycle, the persist-after-fetch write and every update/delete/save are
//! fire-and-forget: they are logged and never surfaced.
//!
//! Writes are queued at call time and applied one after another by a single
//! writer task, so the store sees them in the order they were requested.

use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::background::BackgroundTasks;
use crate::remote::{NetworkError, RemoteSource};
use crate::store::TaskStore;
use crate::types::Task;

/// Requests the presenter makes of the interactor.
///
/// Every method returns immediately; results arrive through
/// [`InteractorOutput`].
pub trait TasksInteractor: Send + Sync {
    /// Starts a fetch cycle.
    fn fetch_tasks(&self);

    /// Persists a changed task (fire-and-forget).
    fn update_task(&self, task: Task);

    /// Persists an edited task, inserting it first if it is new
    /// (fire-and-forget).
    fn save_task(&self, task: Task);

    /// Removes a task from the store (fire-and-forget).
    fn delete_task(&self, id: Uuid);
}

/// Results the interactor reports back.
pub trait InteractorOutput: Send + Sync {
    /// A fetch cycle produced tasks.
    fn tasks_received(&self, tasks: Vec<Task>);

    /// Both tiers failed; the remote error is attached.
    fn tasks_fetch_failed(&self, error: NetworkError);
}

/// How a fetch cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The local store had tasks; the remote source was not consulted.
    LocalHit { count: usize },

    /// The remote source supplied tasks; they are being persisted.
    RemoteHit { count: usize },

    /// Both tiers were empty. Nothing is reported.
    RemoteEmpty,

    /// A newer remote fetch superseded this one. Nothing is reported.
    Superseded,

    /// The remote read failed and the failure was reported.
    Failed(NetworkError),
}

/// A store write waiting for the writer task.
#[derive(Debug)]
enum Write {
    Persist(Vec<Task>),
    Update(Task),
    Save(Task),
    Delete(Uuid),
}

struct QueuedWrite {
    write: Write,
    done: oneshot::Sender<()>,
}

type WriteQueue = mpsc::UnboundedSender<QueuedWrite>;

/// Cache-first reconciler over a [`TaskStore`] and a [`RemoteSource`].
pub struct Reconciler<R, S> {
    remote: Arc<R>,
    store: Arc<S>,
    output: Arc<dyn InteractorOutput>,
    background: BackgroundTasks,
    writes: Arc<OnceLock<WriteQueue>>,
}

impl<R, S> Clone for Reconciler<R, S> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            store: Arc::clone(&self.store),
            output: Arc::clone(&self.output),
            background: self.background.clone(),
            writes: Arc::clone(&self.writes),
        }
    }
}

impl<R: RemoteSource, S: TaskStore> Reconciler<R, S> {
    /// Creates a reconciler reporting to `output`.
    pub fn new(remote: Arc<R>, store: Arc<S>, output: Arc<dyn InteractorOutput>) -> Self {
        Self {
            remote,
            store,
            output,
            background: BackgroundTasks::new(),
            writes: Arc::new(OnceLock::new()),
        }
    }

    /// Records background work in `background` instead of a private tracker,
    /// so it can be awaited together with other components' work.
    #[must_use]
    pub fn with_background(mut self, background: BackgroundTasks) -> Self {
        self.background = background;
        self
    }

    /// Runs one fetch cycle to completion and reports the result.
    ///
    /// Persisting remote results is started in the background; use
    /// [`settle`](Self::settle) to wait for it.
    pub async fn reconcile(&self) -> FetchOutcome {
        match self.store.fetch_all().await {
            Ok(tasks) if !tasks.is_empty() => {
                let count = tasks.len();
                debug!(count, "Loaded tasks from local store");
                self.output.tasks_received(tasks);
                return FetchOutcome::LocalHit { count };
            }
            Ok(_) => debug!("Local store is empty, falling back to remote"),
            Err(e) => warn!(error = %e, "Local read failed, falling back to remote"),
        }

        match self.remote.fetch().await {
            Ok(tasks) if tasks.is_empty() => {
                info!("Remote source returned no tasks");
                FetchOutcome::RemoteEmpty
            }
            Ok(tasks) => {
                let count = tasks.len();
                info!(count, "Loaded tasks from remote source");
                self.output.tasks_received(tasks.clone());
                self.persist_fetched(tasks);
                FetchOutcome::RemoteHit { count }
            }
            Err(NetworkError::Cancelled) => {
                debug!("Remote fetch superseded");
                FetchOutcome::Superseded
            }
            Err(e) => {
                warn!(error = %e, "Remote fetch failed");
                self.output.tasks_fetch_failed(e.clone());
                FetchOutcome::Failed(e)
            }
        }
    }

    /// Waits for every background job this reconciler started.
    pub async fn settle(&self) {
        self.background.settle().await;
    }

    fn persist_fetched(&self, tasks: Vec<Task>) {
        self.enqueue(Write::Persist(tasks));
    }

    /// Queues `write` behind every earlier write. The background tracker
    /// holds a job that finishes once the write has been applied.
    fn enqueue(&self, write: Write) {
        let queue = self
            .writes
            .get_or_init(|| spawn_writer(Arc::clone(&self.store)));

        let (done, applied) = oneshot::channel();
        if let Err(e) = queue.send(QueuedWrite { write, done }) {
            warn!(write = ?e.0.write, "Store writer stopped, dropping write");
            return;
        }

        self.background.spawn(async move {
            let _ = applied.await;
        });
    }
}

/// Starts the task that applies queued writes in order. It stops once every
/// reconciler clone holding the queue is dropped.
fn spawn_writer<S: TaskStore>(store: Arc<S>) -> WriteQueue {
    let (queue, mut writes) = mpsc::unbounded_channel::<QueuedWrite>();

    tokio::spawn(async move {
        while let Some(QueuedWrite { write, done }) = writes.recv().await {
            apply(store.as_ref(), write).await;
            let _ = done.send(());
        }
        debug!("Store writer finished");
    });

    queue
}

async fn apply<S: TaskStore>(store: &S, write: Write) {
    match write {
        Write::Persist(tasks) => {
            let count = tasks.len();
            match store.create_all(tasks).await {
                Ok(()) => debug!(count, "Persisted fetched tasks"),
                Err(e) => warn!(error = %e, "Failed to persist fetched tasks"),
            }
        }
        Write::Update(task) => {
            let id = task.id;
            if let Err(e) = store.update(task).await {
                warn!(id = %id, error = %e, "Failed to update task");
            }
        }
        Write::Save(task) => {
            let id = task.id;
            let result = match store.create_all(vec![task.clone()]).await {
                Ok(()) => store.update(task).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(id = %id, error = %e, "Failed to save task");
            }
        }
        Write::Delete(id) => {
            if let Err(e) = store.delete(id).await {
                warn!(id = %id, error = %e, "Failed to delete task");
            }
        }
    }
}

impl<R: RemoteSource, S: TaskStore> TasksInteractor for Reconciler<R, S> {
    fn fetch_tasks(&self) {
        let reconciler = self.clone();
        self.background.spawn(async move {
            let outcome = reconciler.reconcile().await;
            debug!(?outcome, "Fetch cycle finished");
        });
    }

    fn update_task(&self, task: Task) {
        self.enqueue(Write::Update(task));
    }

    fn save_task(&self, task: Task) {
        self.enqueue(Write::Save(task));
    }

    fn delete_task(&self, id: Uuid) {
        self.enqueue(Write::Delete(id));
    }
}
