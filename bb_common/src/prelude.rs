//! Prelude module for common re-exports.
//!
//! ```rust
//! use bb_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, HarnessSettings, LogLevel, OooTarget, RunConfig, SharedConfig,
};

// ─── Naming ─────────────────────────────────────────────────────────
pub use crate::naming::{ConfigKey, LogFileMeta};

// ─── Statistics ─────────────────────────────────────────────────────
pub use crate::stats::{RunCounts, RunStats, Stat};
