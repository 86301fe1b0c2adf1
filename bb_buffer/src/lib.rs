//! # Bounded Buffer
//!
//! Fixed-capacity circular buffer shared by producer and consumer threads,
//! the lock set that serializes access to it and to the input/output
//! streams, and the pluggable worker strategies that drive it.
//!
//! # Module Structure
//!
//! - [`buffer`] - Slots, `IN`/`OUT` cursors and the control flags
//! - [`locks`] - Input stream, output log and the four mutual-exclusion regions
//! - [`worker`] - `WorkerStrategy` trait, worker context and reports
//! - [`registry`] - Strategy factory registration
//! - [`strategies`] - Built-in polling strategies
//! - [`error`] - Worker and buffer errors
//!
//! # Architecture
//!
//! ```text
//!  input file ──► [input lock] ──► Producer-N ──► [insert lock] ──┐
//!                                                                 ▼
//!                                                     ┌───────────────────┐
//!                                                     │  BoundedBuffer    │
//!                                                     │  slots, IN, OUT   │
//!                                                     │  KILL / DONE      │
//!                                                     └─────────┬─────────┘
//!                                                               ▼
//!  output log ◄── [output lock] ◄── Consumer-M ◄── [remove lock] ┘
//! ```

pub mod buffer;
pub mod error;
pub mod locks;
pub mod registry;
pub mod strategies;
pub mod worker;

pub use crate::buffer::{BoundedBuffer, ControlFlags, Entry};
pub use crate::error::{BufferError, WorkerError};
pub use crate::locks::{InputStream, LockSet, OutputLog};
pub use crate::registry::{DEFAULT_STRATEGY, StrategyFactory, StrategyRegistry};
pub use crate::strategies::PollingStrategy;
pub use crate::worker::{Role, WorkerContext, WorkerReport, WorkerStrategy};
