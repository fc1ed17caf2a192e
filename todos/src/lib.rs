//! Todos - a single-screen task list with cache-first loading.
//!
//! Tasks are read from a local store; when the store is empty the list is
//! seeded from a remote JSON endpoint and persisted. A presenter keeps the
//! full task set and the filtered subset on screen, applies row changes
//! optimistically and reconciles the full set in the background.
//!
//! # Modules
//!
//! - [`types`]: The task value type and the remote wire shapes
//! - [`remote`]: Remote source port and its HTTP implementation
//! - [`store`]: Local store port and its file-backed implementation
//! - [`background`]: Tracking of fire-and-forget background jobs
//! - [`interactor`]: Local-then-remote reconciliation
//! - [`display`]: Row formatting with a bounded strike-through cache
//! - [`presenter`]: Presenter plus the view and router ports
//! - [`detail`]: Edit surface model
//! - [`dispatch`]: The interactive context and its event loop
//! - [`app`]: Composition root
//! - [`console`]: Line-oriented console adapter
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types

pub mod app;
pub mod background;
pub mod config;
pub mod console;
pub mod detail;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod interactor;
pub mod presenter;
pub mod remote;
pub mod store;
pub mod types;

pub use app::TasksModule;
pub use background::BackgroundTasks;
pub use config::{Config, ConfigError};
pub use detail::TaskEditor;
pub use dispatch::{EventLoop, MainEvent, MainHandle, UserIntent};
pub use display::{RowFormatter, TaskRow};
pub use error::{Result, TodosError};
pub use interactor::{FetchOutcome, InteractorOutput, Reconciler, TasksInteractor};
pub use presenter::{TasksPresenter, TasksRouter, TasksView};
pub use remote::{HttpRemoteSource, NetworkError, RemoteSource};
pub use store::{LocalStore, ServiceError, StoreOperation, TaskStore};
pub use types::{derive_title, Task};
