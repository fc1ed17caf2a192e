//! Configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TODOS_ENDPOINT_URL` | No | `https://dummyjson.com/todos` | Remote task-list endpoint |
//! | `TODOS_STORE_PATH` | No | `~/.todos/tasks.json` | Local store file |
//! | `TODOS_REQUEST_TIMEOUT_SECS` | No | 30 | HTTP request timeout |
//! | `TODOS_TITLE_CACHE_SIZE` | No | 256 | Struck-through title cache capacity |
//!
//! # Example
//!
//! ```no_run
//! use todos::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Endpoint: {}", config.endpoint_url);
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

use crate::display::DEFAULT_TITLE_CACHE_SIZE;
use crate::remote::DEFAULT_ENDPOINT;

/// Default store directory name relative to home.
const DEFAULT_STORE_DIR: &str = ".todos";

/// Default store file name inside the store directory.
const DEFAULT_STORE_FILE: &str = "tasks.json";

/// Default HTTP request timeout (in seconds).
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Configuration for the task list.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote task-list endpoint. Validated when a fetch is attempted.
    pub endpoint_url: String,

    /// Path of the local store file.
    pub store_path: PathBuf,

    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,

    /// Capacity of the struck-through title cache.
    pub title_cache_size: usize,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - a numeric variable is set but is not a positive integer
    /// - `TODOS_STORE_PATH` is unset and the home directory cannot be determined
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint_url =
            env::var("TODOS_ENDPOINT_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        // Optional: TODOS_STORE_PATH (default: ~/.todos/tasks.json)
        let store_path = match env::var("TODOS_STORE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs
                    .home_dir()
                    .join(DEFAULT_STORE_DIR)
                    .join(DEFAULT_STORE_FILE)
            }
        };

        let timeout_secs = parse_positive::<u64>("TODOS_REQUEST_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let title_cache_size = parse_positive::<usize>("TODOS_TITLE_CACHE_SIZE")?
            .unwrap_or(DEFAULT_TITLE_CACHE_SIZE);

        Ok(Self {
            endpoint_url,
            store_path,
            request_timeout: Duration::from_secs(timeout_secs),
            title_cache_size,
        })
    }
}

/// Reads `key` as an integer greater than zero, if set. Values that do not
/// fit `T` are rejected.
fn parse_positive<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialEq + From<u8>,
{
    let Ok(val) = env::var(key) else {
        return Ok(None);
    };

    let value = val.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected positive integer, got '{val}'"),
    })?;

    if value == T::from(0) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value must be greater than 0".to_string(),
        });
    }

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Runs `f` with every `TODOS_*` variable removed, restoring them after.
    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let saved_vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with("TODOS_"))
            .collect();

        for (key, _) in &saved_vars {
            env::remove_var(key);
        }

        let result = f();

        for (key, _) in env::vars().filter(|(k, _)| k.starts_with("TODOS_")) {
            env::remove_var(key);
        }
        for (key, value) in saved_vars {
            env::set_var(key, value);
        }

        result
    }

    #[test]
    #[serial]
    fn test_defaults() {
        with_clean_env(|| {
            let config = Config::from_env().unwrap();

            assert_eq!(config.endpoint_url, "https://dummyjson.com/todos");
            assert!(config.store_path.ends_with(".todos/tasks.json"));
            assert_eq!(config.request_timeout, Duration::from_secs(30));
            assert_eq!(config.title_cache_size, 256);
        });
    }

    #[test]
    #[serial]
    fn test_full_config() {
        with_clean_env(|| {
            env::set_var("TODOS_ENDPOINT_URL", "http://localhost:8080/todos");
            env::set_var("TODOS_STORE_PATH", "/tmp/todos/store.json");
            env::set_var("TODOS_REQUEST_TIMEOUT_SECS", "5");
            env::set_var("TODOS_TITLE_CACHE_SIZE", "16");

            let config = Config::from_env().unwrap();

            assert_eq!(config.endpoint_url, "http://localhost:8080/todos");
            assert_eq!(config.store_path, PathBuf::from("/tmp/todos/store.json"));
            assert_eq!(config.request_timeout, Duration::from_secs(5));
            assert_eq!(config.title_cache_size, 16);
        });
    }

    #[test]
    #[serial]
    fn test_invalid_endpoint_is_not_rejected_here() {
        with_clean_env(|| {
            env::set_var("TODOS_ENDPOINT_URL", "not a url");

            let config = Config::from_env().unwrap();

            assert_eq!(config.endpoint_url, "not a url");
        });
    }

    #[test]
    #[serial]
    fn test_invalid_timeout() {
        with_clean_env(|| {
            env::set_var("TODOS_REQUEST_TIMEOUT_SECS", "soon");

            let err = Config::from_env().unwrap_err();

            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TODOS_REQUEST_TIMEOUT_SECS")
            );
            assert_eq!(
                err.to_string(),
                "invalid value for TODOS_REQUEST_TIMEOUT_SECS: expected positive integer, got 'soon'"
            );
        });
    }

    #[test]
    #[serial]
    fn test_zero_cache_size_rejected() {
        with_clean_env(|| {
            env::set_var("TODOS_TITLE_CACHE_SIZE", "0");

            let err = Config::from_env().unwrap_err();

            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, ref message } if key == "TODOS_TITLE_CACHE_SIZE" && message.contains("greater than 0"))
            );
        });
    }

    #[test]
    #[serial]
    fn test_negative_timeout_rejected() {
        with_clean_env(|| {
            env::set_var("TODOS_REQUEST_TIMEOUT_SECS", "-1");

            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    #[serial]
    fn test_cache_size_beyond_usize_rejected() {
        with_clean_env(|| {
            let too_large = (usize::MAX as u128 + 1).to_string();
            env::set_var("TODOS_TITLE_CACHE_SIZE", &too_large);

            let err = Config::from_env().unwrap_err();

            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TODOS_TITLE_CACHE_SIZE")
            );
        });
    }

    #[test]
    #[serial]
    fn test_largest_cache_size_kept_exactly() {
        with_clean_env(|| {
            env::set_var("TODOS_TITLE_CACHE_SIZE", usize::MAX.to_string());

            let config = Config::from_env().unwrap();

            assert_eq!(config.title_cache_size, usize::MAX);
        });
    }
}
