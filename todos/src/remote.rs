//! Remote source for the seed task list.
//!
//! The remote endpoint is only consulted when the local store is empty. It
//! returns a JSON object whose `todos` field lists bodies and completion flags;
//! identifiers, titles and timestamps are synthesized client-side (see
//! [`Task::from_remote`](crate::types::Task::from_remote)).
//!
//! # In-flight requests
//!
//! [`HttpRemoteSource`] keeps at most one request in flight. Starting a new
//! fetch aborts the previous one, whose caller receives
//! [`NetworkError::Cancelled`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use todos::remote::{HttpRemoteSource, RemoteSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let remote = HttpRemoteSource::new(
//!         "https://dummyjson.com/todos",
//!         Duration::from_secs(30),
//!     )
//!     .unwrap();
//!
//!     match remote.fetch().await {
//!         Ok(tasks) => println!("fetched {} tasks", tasks.len()),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, error};

use crate::types::{RemoteTaskList, Task};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://dummyjson.com/todos";

/// Errors that can occur while fetching the remote task list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The configured endpoint is not a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The server answered with a non-success status.
    #[error("server error with code {0}")]
    Server(u16),

    /// The request never produced a response (connection, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not a task list.
    #[error("decoding failed at line {line} column {column}")]
    DecodingFailed {
        /// Line reported by the JSON decoder.
        line: usize,
        /// Column reported by the JSON decoder.
        column: usize,
    },

    /// A newer fetch superseded this one.
    #[error("request cancelled by a newer fetch")]
    Cancelled,
}

impl From<serde_json::Error> for NetworkError {
    fn from(e: serde_json::Error) -> Self {
        Self::DecodingFailed {
            line: e.line(),
            column: e.column(),
        }
    }
}

/// Port for reading the remote task list.
pub trait RemoteSource: Send + Sync + 'static {
    /// Fetches and hydrates the full remote task list.
    fn fetch(&self) -> impl Future<Output = Result<Vec<Task>, NetworkError>> + Send;
}

/// The request currently in flight, tagged with the fetch generation that
/// started it.
struct ActiveRequest {
    generation: u64,
    handle: AbortHandle,
}

/// [`RemoteSource`] backed by a `reqwest` client.
pub struct HttpRemoteSource {
    /// The underlying HTTP client.
    client: Client,

    /// Endpoint as configured; parsed on every fetch.
    endpoint: String,

    /// Request that a new fetch must cancel.
    active: Mutex<Option<ActiveRequest>>,

    next_generation: AtomicU64,
}

impl HttpRemoteSource {
    /// Creates a new remote source.
    ///
    /// The endpoint is not validated here; an invalid endpoint surfaces as
    /// [`NetworkError::InvalidUrl`] on the first fetch.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Transport`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            active: Mutex::new(None),
            next_generation: AtomicU64::new(0),
        })
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Registers a new in-flight request, aborting whichever one it replaces.
    fn replace_active(&self, generation: u64, handle: AbortHandle) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.replace(ActiveRequest { generation, handle }) {
            debug!(
                superseded = previous.generation,
                generation, "Cancelling in-flight fetch"
            );
            previous.handle.abort();
        }
    }

    /// Forgets the in-flight request if it still belongs to `generation`.
    fn clear_active(&self, generation: u64) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|a| a.generation == generation) {
            *active = None;
        }
    }
}

impl RemoteSource for HttpRemoteSource {
    async fn fetch(&self) -> Result<Vec<Task>, NetworkError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| NetworkError::InvalidUrl(format!("{}: {e}", self.endpoint)))?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        debug!(url = %url, generation, "Fetching remote tasks");

        let request = self.client.get(url);
        let join = tokio::spawn(async move { execute(request).await });
        self.replace_active(generation, join.abort_handle());

        let result = match join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(NetworkError::Cancelled),
            Err(e) => {
                error!(error = %e, "Remote fetch task panicked");
                Err(NetworkError::Transport(e.to_string()))
            }
        };

        self.clear_active(generation);

        if let Ok(tasks) = &result {
            debug!(count = tasks.len(), generation, "Fetched remote tasks");
        }

        result
    }
}

/// Sends the request and decodes the task list.
async fn execute(request: reqwest::RequestBuilder) -> Result<Vec<Task>, NetworkError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            NetworkError::Transport(format!("request timed out: {e}"))
        } else if e.is_connect() {
            NetworkError::Transport(format!("connection failed: {e}"))
        } else {
            NetworkError::Transport(format!("request failed: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::Server(status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| NetworkError::Transport(format!("failed to read body: {e}")))?;

    let list: RemoteTaskList = serde_json::from_slice(&body)?;
    Ok(list.into_tasks())
}
