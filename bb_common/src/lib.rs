//! Bounded-Buffer Common Library
//!
//! Shared constants, configuration loading and statistics types used by the
//! buffer/worker crate and the harness crate.
//!
//! # Module Structure
//!
//! - [`consts`] - Harness defaults (counts, timeouts, directories)
//! - [`config`] - Settings file, grade file, run configuration, OOO target
//! - [`naming`] - Config keys and the output-log filename convention
//! - [`stats`] - Count/base statistics and their aggregation
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use bb_common::prelude::*;
//!
//! let config = RunConfig::new("Demo", 3, 1, 10, 100, std::time::Duration::from_secs(2));
//! assert_eq!(config.key().to_string(), "p3_c1_s10_i100");
//! ```

pub mod config;
pub mod consts;
pub mod naming;
pub mod prelude;
pub mod stats;
