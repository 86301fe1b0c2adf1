//! Harness-wide defaults.
//!
//! Single source of truth for the default run shape and on-disk layout.

/// Default number of producer threads.
pub const DEFAULT_PRODUCERS: u32 = 3;

/// Default number of consumer threads.
pub const DEFAULT_CONSUMERS: u32 = 1;

/// Default number of buffer slots.
pub const DEFAULT_SLOTS: u32 = 10;

/// Default number of items written to the input file.
pub const DEFAULT_ITEMS: u32 = 100;

/// Default number of runs per configuration.
pub const DEFAULT_RUNS: u32 = 1;

/// Default seconds before the watchdog sets `KILL`.
pub const DEFAULT_TIMEOUT_SECS: f64 = 2.0;

/// Default config name for runs described on the command line.
pub const DEFAULT_CONFIG_NAME: &str = "CMD-LINE";

/// Default grade configuration file.
pub const DEFAULT_GRADE_FILE: &str = "sample_grade_configs.txt";

/// Default analyze-only pattern.
pub const DEFAULT_ANALYZE_PATTERN: &str = "output/*";

/// Default directory for generated input files.
pub const DEFAULT_INPUT_DIR: &str = "input";

/// Default directory for run output logs.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Extension used for input files and output logs.
pub const LOG_EXTENSION: &str = "txt";

/// Separator between config name and key tokens in filenames.
pub const KEY_SEPARATOR: char = '_';

/// Prefix of names generated for configs discovered from log filenames.
pub const DISCOVERED_CONFIG_PREFIX: &str = "CONFIG";

/// Upper bound of the host-derived OOO target, in percent.
pub const OOO_TARGET_CAP: f64 = 40.0;

/// OOO target percent contributed by each available CPU.
pub const OOO_TARGET_PER_CPU: f64 = 4.5;

/// OOO target used when the CPU count cannot be determined.
pub const OOO_TARGET_FALLBACK: f64 = 10.0;
