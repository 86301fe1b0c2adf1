//! Harness error type.
//!
//! Configuration faults abort before any run starts. Everything a single run
//! can hit (worker I/O, panics, a failed sentinel write) is recorded on the
//! run instead of being returned through here.

use bb_buffer::{BufferError, WorkerError};
use bb_common::config::ConfigError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a harness operation.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Bad settings file, grade file, CLI value or config name.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File or directory access failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker could not be set up for a run.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The run buffer could not be created.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// A run lifecycle transition was rejected.
    #[error("run lifecycle violation: {0}")]
    Lifecycle(String),

    /// Statistics could not be serialized.
    #[error("failed to serialize statistics: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type alias for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
