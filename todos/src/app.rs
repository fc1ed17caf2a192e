//! Composition root.
//!
//! [`TasksModule`] wires the remote source, the local store, the reconciler
//! and the presenter together and hands back the pieces the caller drives:
//! a [`MainHandle`] for input and the [`EventLoop`] to run.
//!
//! # Example
//!
//! ```no_run
//! use todos::app::TasksModule;
//! use todos::config::Config;
//! use todos::console::{ConsoleRouter, ConsoleSession, ConsoleView};
//!
//! # async fn run() -> todos::Result<()> {
//! let config = Config::from_env()?;
//! let session = ConsoleSession::new();
//! let module = TasksModule::build(
//!     &config,
//!     ConsoleView::new(std::io::stdout()),
//!     ConsoleRouter::new(std::io::stdout(), session),
//! )?;
//! let (main, event_loop) = module.into_parts();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::background::BackgroundTasks;
use crate::config::Config;
use crate::dispatch::{EventLoop, MainHandle};
use crate::error::Result;
use crate::interactor::Reconciler;
use crate::presenter::{TasksPresenter, TasksRouter, TasksView};
use crate::remote::{HttpRemoteSource, RemoteSource};
use crate::store::{LocalStore, TaskStore};

/// The assembled task list screen.
pub struct TasksModule<V, R> {
    main: MainHandle,
    event_loop: EventLoop<V, R>,
}

impl<V: TasksView, R: TasksRouter> TasksModule<V, R> {
    /// Builds the screen over HTTP and the file-backed store described by
    /// `config`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be created or the store file exists
    /// but cannot be read.
    pub fn build(config: &Config, view: V, router: R) -> Result<Self> {
        let remote = HttpRemoteSource::new(config.endpoint_url.clone(), config.request_timeout)?;
        let store = LocalStore::open(config.store_path.clone())?;

        info!(
            endpoint = %config.endpoint_url,
            store = %config.store_path.display(),
            "Task list assembled"
        );

        Ok(Self::assemble(
            Arc::new(remote),
            Arc::new(store),
            view,
            router,
            config.title_cache_size,
        ))
    }

    /// Wires the screen over any remote source and store.
    pub fn assemble<Src, St>(
        remote: Arc<Src>,
        store: Arc<St>,
        view: V,
        router: R,
        title_cache_size: usize,
    ) -> Self
    where
        Src: RemoteSource,
        St: TaskStore,
    {
        let (main, events) = MainHandle::channel();
        let background = BackgroundTasks::new();

        let reconciler = Reconciler::new(remote, store, Arc::new(main.clone()))
            .with_background(background.clone());

        let presenter = TasksPresenter::new(Arc::new(reconciler), view, router, main.clone())
            .with_title_cache_size(title_cache_size)
            .with_background(background);

        Self {
            main,
            event_loop: EventLoop::new(presenter, events),
        }
    }

    /// Handle for posting input.
    pub fn handle(&self) -> MainHandle {
        self.main.clone()
    }

    /// The event loop, for driving it step by step.
    pub fn event_loop(&mut self) -> &mut EventLoop<V, R> {
        &mut self.event_loop
    }

    /// Splits the module into its input handle and its loop.
    pub fn into_parts(self) -> (MainHandle, EventLoop<V, R>) {
        (self.main, self.event_loop)
    }
}
