//! Worker strategy trait and the context handed to each worker.
//!
//! A strategy is the capability set `{produce, consume}`. The orchestrator
//! picks one strategy for producers and one for consumers when a run starts
//! and calls it from every worker thread of that class.
//!
//! # Contract
//!
//! - `produce` returns at end of input or once `KILL` is observed.
//! - `consume` returns once the buffer is empty after `PRODUCERS_DONE`, or
//!   once `KILL` is observed.
//! - Every wait loop re-checks `KILL`; nothing blocks except on locks.
//! - Full/empty buffers are not errors; only stream I/O faults are returned.

use crate::buffer::BoundedBuffer;
use crate::error::WorkerError;
use crate::locks::LockSet;
use std::fmt;

/// Worker class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.write_str("Producer"),
            Role::Consumer => f.write_str("Consumer"),
        }
    }
}

/// Shared state visible to a worker.
#[derive(Clone, Copy)]
pub struct WorkerContext<'a> {
    pub buffer: &'a BoundedBuffer,
    pub locks: &'a LockSet,
}

impl<'a> WorkerContext<'a> {
    pub fn new(buffer: &'a BoundedBuffer, locks: &'a LockSet) -> Self {
        Self { buffer, locks }
    }
}

/// What a worker accomplished before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub role: Role,
    pub id: u32,
    /// Items inserted (producer) or logged (consumer).
    pub items: u64,
}

/// Producer/consumer capability set.
pub trait WorkerStrategy: Send + Sync {
    /// Registry name (e.g. `"spin"`).
    fn name(&self) -> &'static str;

    /// One-line description for `--list-strategies`.
    fn description(&self) -> &'static str {
        ""
    }

    /// Move items from the input stream into the buffer.
    fn produce(&self, id: u32, ctx: &WorkerContext<'_>) -> Result<WorkerReport, WorkerError>;

    /// Move items from the buffer into the output log.
    fn consume(&self, id: u32, ctx: &WorkerContext<'_>) -> Result<WorkerReport, WorkerError>;
}
