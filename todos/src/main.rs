//! Todos - console front end for the task list.
//!
//! Loads tasks from the local store (seeding it from the remote endpoint on
//! first run) and reads commands from standard input. Logs go to standard
//! error so they never interleave with the list on standard output.
//!
//! # Environment Variables
//!
//! See the [`config`](todos::config) module for available configuration
//! options.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use todos::app::TasksModule;
use todos::config::Config;
use todos::console::{Console, ConsoleRouter, ConsoleSession, ConsoleView, Flow, USAGE};
use todos::dispatch::UserIntent;

/// Time allowed for pending persistence after the loop stops.
const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Todos - a task list that works offline.
///
/// Reads tasks from a local file and seeds it from a remote endpoint when
/// empty.
#[derive(Parser, Debug)]
#[command(name = "todos")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    TODOS_ENDPOINT_URL          Remote endpoint (default: https://dummyjson.com/todos)
    TODOS_STORE_PATH            Store file (default: ~/.todos/tasks.json)
    TODOS_REQUEST_TIMEOUT_SECS  HTTP timeout in seconds (default: 30)
    TODOS_TITLE_CACHE_SIZE      Struck-through title cache size (default: 256)
    RUST_LOG                    Log filter (default: info)

EXAMPLES:
    # Start with defaults
    todos

    # Use a scratch store against a local endpoint
    todos --store /tmp/tasks.json --endpoint http://localhost:8080/todos")]
struct Cli {
    /// Remote endpoint, overrides TODOS_ENDPOINT_URL
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Store file, overrides TODOS_STORE_PATH
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint_url = endpoint;
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let session = ConsoleSession::new();
    let module = TasksModule::build(
        &config,
        ConsoleView::new(io::stdout()),
        ConsoleRouter::new(io::stdout(), session.clone()),
    )
    .context("Failed to start task list")?;

    let (main, event_loop) = module.into_parts();
    let console = Console::new(main.clone(), session);
    let event_loop = tokio::spawn(event_loop.run());

    println!("Type 'help' for commands.");
    main.intent(UserIntent::Load);

    tokio::select! {
        () = read_commands(&console) => {},
        () = wait_for_shutdown() => info!("Shutdown signal received"),
    }

    main.shutdown();
    match tokio::time::timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), event_loop).await {
        Ok(Ok(_presenter)) => debug!("Pending work flushed"),
        Ok(Err(e)) => error!(error = %e, "Event loop failed"),
        Err(_) => warn!("Timed out waiting for pending work"),
    }

    Ok(())
}

/// Initializes the tracing subscriber, writing to stderr.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

/// Reads and executes commands until `quit` or end of input.
async fn read_commands(console: &Console) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("End of input");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to read input");
                return;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match console.execute_line(&line) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Help) => println!("{USAGE}"),
            Ok(Flow::Quit) => return,
            Err(e) => println!("{e} (type 'help' for commands)"),
        }
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
