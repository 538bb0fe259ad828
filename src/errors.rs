// src/errors.rs

//! Crate-wide error type and helpers.
//!
//! Collaborators (watcher, runner, finder) speak `anyhow::Result`; the
//! coordinator wraps their failures into the tagged variants below so the
//! caller can tell which stage failed and for which path.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("watch coordinator is already running")]
    AlreadyRunning,

    #[error("watch coordinator is not running")]
    NotRunning,

    #[error("unknown watch mode: {0} (expected \"all\", \"changed\" or \"related\")")]
    UnknownMode(String),

    #[error("invalid file change event: {0}")]
    InvalidEvent(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file watcher failed during {op}: {source}")]
    Watcher {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("debouncer failed during {op}: {source}")]
    Debouncer {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("triggering tests for {} ({mode}) failed: {source}", .path.display())]
    Trigger {
        path: PathBuf,
        mode: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("errors during shutdown: {}", ShutdownErrors(.0))]
    Shutdown(Vec<WatchError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchError {
    /// Path of the change that failed, for trigger failures.
    pub fn failing_path(&self) -> Option<&std::path::Path> {
        match self {
            WatchError::Trigger { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}

struct ShutdownErrors<'a>(&'a [WatchError]);

impl fmt::Display for ShutdownErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
