//! # Bounded-Buffer Harness Library
//!
//! Drives producer/consumer runs over the shared circular buffer, analyzes
//! the resulting output logs and grades them.
//!
//! # Module Structure
//!
//! - [`orchestrator`] - One run: input file, worker threads, watchdog, log
//! - [`lifecycle`] - Run state machine (created → running → closed)
//! - [`watchdog`] - Timeout and interrupt supervision of a run
//! - [`analyzer`] - Offline analysis of one output log
//! - [`aggregator`] - Config registry and per-config run totals
//! - [`report`] - Text reports, sample score and JSON stats
//! - [`session`] - Run sweeps and analyze-only sessions
//! - [`pattern`] - Wildcard file selection for analyze-only mode
//! - [`error`] - Harness error type
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          bb_harness                          │
//! │  ┌──────────────┐   ┌────────────────┐   ┌───────────────┐   │
//! │  │   session    │──►│  orchestrator  │──►│   bb_buffer   │   │
//! │  │ (sweep loop) │   │ (threads, log) │   │ (buffer, locks│   │
//! │  └──────┬───────┘   └───────┬────────┘   │  strategies)  │   │
//! │         │                   │ watchdog   └───────────────┘   │
//! │         ▼                   ▼                                │
//! │  ┌──────────────┐   ┌────────────────┐   ┌───────────────┐   │
//! │  │  aggregator  │◄──│    analyzer    │   │    report     │   │
//! │  │  (registry)  │──────────────────────►│ (text, score) │   │
//! │  └──────────────┘   └────────────────┘   └───────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod pattern;
pub mod report;
pub mod session;
pub mod watchdog;

// Re-export key types for convenience
pub use crate::aggregator::{ConfigGroup, ConfigRegistry, RunResult};
pub use crate::analyzer::RunAnalysis;
pub use crate::error::{HarnessError, HarnessResult};
pub use crate::orchestrator::{RunOrchestrator, RunOutcome};
pub use crate::report::{SampleScore, StatsReport};
pub use crate::session::SweepOptions;
pub use crate::watchdog::KillReason;
