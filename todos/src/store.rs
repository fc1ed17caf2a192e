//! Local task store.
//!
//! The store is the cache-first source of truth: one record per task, looked
//! up by identifier, kept in insertion order.
//!
//! # Execution model
//!
//! [`LocalStore`] is a cheap, cloneable handle. All records live on a single
//! dedicated thread (`todos-store`) that executes commands one at a time, so
//! operations never run concurrently with each other and never block the
//! caller's context. Each call sends a command and awaits a `oneshot` reply.
//!
//! When opened with a path, every successful mutation is written back to a
//! JSON file (temp file + rename). [`LocalStore::in_memory`] keeps records in
//! memory only.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::types::Task;

/// Name of the thread that owns the records.
const STORE_THREAD_NAME: &str = "todos-store";

/// Diagnostic code reported when the store thread has gone away.
const CLOSED_CODE: &str = "store closed";

/// Kind of store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Insertion,
    Retrieve,
    Update,
    Deletion,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insertion => "insertion",
            Self::Retrieve => "retrieve",
            Self::Update => "update",
            Self::Deletion => "deletion",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The operation failed; `code` is an opaque diagnostic.
    #[error("task {operation} operation failed: {code}")]
    Operation {
        operation: StoreOperation,
        code: String,
    },

    /// No record with the given identifier exists.
    #[error("task {operation} operation failed: no task with id {id}")]
    NotFound { operation: StoreOperation, id: Uuid },
}

impl ServiceError {
    fn operation(operation: StoreOperation, code: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            code: code.into(),
        }
    }

    fn io(operation: StoreOperation, e: &io::Error) -> Self {
        let code = e
            .raw_os_error()
            .map_or_else(|| e.kind().to_string(), |c| c.to_string());
        Self::operation(operation, code)
    }

    /// Returns `true` for the not-found condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Port for task persistence.
///
/// Implementations serialize their own operations; callers may invoke them
/// concurrently from any task.
pub trait TaskStore: Send + Sync + 'static {
    /// Inserts every task whose identifier is not stored yet. Tasks with an
    /// existing identifier are skipped without error.
    fn create_all(&self, tasks: Vec<Task>) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Reads every stored task in insertion order.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Task>, ServiceError>> + Send;

    /// Replaces title, body and completion of the stored task with the same
    /// identifier. Fails with [`ServiceError::NotFound`] if there is none.
    fn update(&self, task: Task) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Removes the task with the given identifier. Fails with
    /// [`ServiceError::NotFound`] if there is none.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

enum Command {
    CreateAll { tasks: Vec<Task>, reply: Reply<()> },
    FetchAll { reply: Reply<Vec<Task>> },
    Update { task: Task, reply: Reply<()> },
    Delete { id: Uuid, reply: Reply<()> },
}

/// On-disk layout of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    tasks: Vec<Task>,
}

/// Handle to the store thread.
#[derive(Debug, Clone)]
pub struct LocalStore {
    commands: mpsc::UnboundedSender<Command>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateAll { tasks, .. } => write!(f, "CreateAll({})", tasks.len()),
            Self::FetchAll { .. } => f.write_str("FetchAll"),
            Self::Update { task, .. } => write!(f, "Update({})", task.id),
            Self::Delete { id, .. } => write!(f, "Delete({id})"),
        }
    }
}

impl LocalStore {
    /// Opens a file-backed store, loading existing records from `path`.
    ///
    /// A missing file is treated as an empty store; its parent directory is
    /// created on the first write.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreOperation::Retrieve`] error if the file exists but
    /// cannot be read or parsed, or if the store thread cannot be started.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        let records = load(&path)?;

        info!(
            path = %path.display(),
            count = records.len(),
            "Opened local task store"
        );

        Self::spawn(StoreWorker {
            path: Some(path),
            records,
        })
    }

    /// Creates a store that keeps records in memory only.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreOperation::Retrieve`] error if the store thread cannot
    /// be started.
    pub fn in_memory() -> Result<Self, ServiceError> {
        Self::spawn(StoreWorker {
            path: None,
            records: Vec::new(),
        })
    }

    fn spawn(worker: StoreWorker) -> Result<Self, ServiceError> {
        let (commands, rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name(STORE_THREAD_NAME.to_string())
            .spawn(move || worker.run(rx))
            .map_err(|e| ServiceError::io(StoreOperation::Retrieve, &e))?;

        Ok(Self { commands })
    }

    async fn request<T>(
        &self,
        operation: StoreOperation,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, response) = oneshot::channel();

        self.commands
            .send(command(reply))
            .map_err(|_| ServiceError::operation(operation, CLOSED_CODE))?;

        response
            .await
            .map_err(|_| ServiceError::operation(operation, CLOSED_CODE))?
    }
}

impl TaskStore for LocalStore {
    async fn create_all(&self, tasks: Vec<Task>) -> Result<(), ServiceError> {
        self.request(StoreOperation::Insertion, |reply| Command::CreateAll {
            tasks,
            reply,
        })
        .await
    }

    async fn fetch_all(&self) -> Result<Vec<Task>, ServiceError> {
        self.request(StoreOperation::Retrieve, |reply| Command::FetchAll { reply })
            .await
    }

    async fn update(&self, task: Task) -> Result<(), ServiceError> {
        self.request(StoreOperation::Update, |reply| Command::Update { task, reply })
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.request(StoreOperation::Deletion, |reply| Command::Delete { id, reply })
            .await
    }
}

/// Reads the store file, treating a missing file as empty.
fn load(path: &Path) -> Result<Vec<Task>, ServiceError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ServiceError::io(StoreOperation::Retrieve, &e)),
    };

    let file: StoreFile = serde_json::from_slice(&contents).map_err(|e| {
        ServiceError::operation(
            StoreOperation::Retrieve,
            format!("invalid store file at line {} column {}", e.line(), e.column()),
        )
    })?;

    Ok(file.tasks)
}

/// Owns the records on the store thread.
struct StoreWorker {
    path: Option<PathBuf>,
    records: Vec<Task>,
}

impl StoreWorker {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        debug!("Store thread started");

        while let Some(command) = rx.blocking_recv() {
            trace!(?command, "Executing store command");

            // A dropped reply means the caller stopped waiting; the command
            // has still been applied.
            match command {
                Command::CreateAll { tasks, reply } => {
                    let _ = reply.send(self.create_all(tasks));
                }
                Command::FetchAll { reply } => {
                    let _ = reply.send(Ok(self.records.clone()));
                }
                Command::Update { task, reply } => {
                    let _ = reply.send(self.update(task));
                }
                Command::Delete { id, reply } => {
                    let _ = reply.send(self.delete(id));
                }
            }
        }

        debug!("Store thread stopped");
    }

    fn create_all(&mut self, tasks: Vec<Task>) -> Result<(), ServiceError> {
        let mut seen: HashSet<Uuid> = self.records.iter().map(|t| t.id).collect();
        let before = self.records.len();

        for task in tasks {
            if seen.insert(task.id) {
                self.records.push(task);
            }
        }

        let inserted = self.records.len() - before;
        if inserted == 0 {
            return Ok(());
        }

        if let Err(e) = self.persist(StoreOperation::Insertion) {
            self.records.truncate(before);
            return Err(e);
        }

        debug!(inserted, total = self.records.len(), "Inserted tasks");
        Ok(())
    }

    fn update(&mut self, task: Task) -> Result<(), ServiceError> {
        let index = self.position(task.id, StoreOperation::Update)?;

        let previous = self.records[index].clone();
        let stored = &mut self.records[index];
        stored.title = task.title;
        stored.todo = task.todo;
        stored.is_completed = task.is_completed;

        if let Err(e) = self.persist(StoreOperation::Update) {
            self.records[index] = previous;
            return Err(e);
        }

        debug!(id = %task.id, "Updated task");
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> Result<(), ServiceError> {
        let index = self.position(id, StoreOperation::Deletion)?;
        let removed = self.records.remove(index);

        if let Err(e) = self.persist(StoreOperation::Deletion) {
            self.records.insert(index, removed);
            return Err(e);
        }

        debug!(id = %id, "Deleted task");
        Ok(())
    }

    fn position(&self, id: Uuid, operation: StoreOperation) -> Result<usize, ServiceError> {
        self.records
            .iter()
            .position(|t| t.id == id)
            .ok_or(ServiceError::NotFound { operation, id })
    }

    /// Writes all records to the store file, if there is one.
    fn persist(&self, operation: StoreOperation) -> Result<(), ServiceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = StoreFile {
            tasks: self.records.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| ServiceError::operation(operation, e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ServiceError::io(operation, &e))?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| ServiceError::io(operation, &e))?;
        fs::rename(&tmp, path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to replace store file");
            ServiceError::io(operation, &e)
        })?;

        Ok(())
    }
}
