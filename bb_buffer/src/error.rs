//! Error types for buffer construction and worker execution.
//!
//! Full and empty buffers are ordinary backpressure and never appear here;
//! only faults on the shared streams, unknown strategies and worker panics do.

use crate::worker::Role;
use thiserror::Error;

/// Errors raised while constructing a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// A buffer cannot be indexed without at least one slot.
    #[error("buffer needs at least one slot")]
    ZeroSlots,
}

/// Errors surfaced by worker threads to the orchestrator.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Reading the shared input stream failed.
    #[error("producer {id} failed reading input: {source}")]
    InputIo {
        /// Producer id.
        id: u32,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the shared output log failed.
    #[error("consumer {id} failed writing output: {source}")]
    OutputIo {
        /// Consumer id.
        id: u32,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No strategy registered under this name.
    #[error("unknown worker strategy '{0}'")]
    StrategyNotFound(String),

    /// The OS refused to start the worker thread.
    #[error("failed to spawn {role} {id}: {source}")]
    Spawn {
        /// Worker class.
        role: Role,
        /// Worker id.
        id: u32,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The worker thread panicked before returning.
    #[error("{role} {id} panicked")]
    Panicked {
        /// Worker class.
        role: Role,
        /// Worker id.
        id: u32,
    },
}
