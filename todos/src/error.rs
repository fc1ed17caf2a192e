//! Error types for the task list.
//!
//! Each component owns its error enum; [`TodosError`] gathers them for the
//! composition root and the binary.

use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::NetworkError;
use crate::store::ServiceError;

/// Errors that can occur while assembling or running the task list.
///
/// # Examples
///
/// ```ignore
/// use todos::error::TodosError;
///
/// fn load() -> Result<(), TodosError> {
///     let config = todos::Config::from_env()?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum TodosError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote source error.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Local store error.
    #[error("store error: {0}")]
    Store(#[from] ServiceError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for task list operations.
pub type Result<T> = std::result::Result<T, TodosError>;
