//! Configuration loading traits and types.
//!
//! Three sources feed a harness invocation:
//!
//! - an optional TOML settings file (`[shared]` + `[defaults]`),
//!   loaded through [`ConfigLoader`];
//! - an optional grade file of whitespace-separated run configurations;
//! - command-line flags, which take precedence over both.
//!
//! # Usage
//!
//! ```rust,no_run
//! use bb_common::config::{ConfigError, ConfigLoader, HarnessSettings};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let settings = HarnessSettings::load(Path::new("harness.toml"))?;
//!     println!("log level: {:?}", settings.shared.log_level);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DISCOVERED_CONFIG_PREFIX, KEY_SEPARATOR, OOO_TARGET_CAP, OOO_TARGET_FALLBACK,
    OOO_TARGET_PER_CPU,
};
use crate::naming::ConfigKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Error type for configuration loading and validation.
///
/// Every variant is fatal: the harness reports it and exits before any run
/// starts.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// TOML parsing or file reading failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// A grade file line could not be turned into a run configuration.
    #[error("Invalid grade config at line {line}: '{text}' ({reason})")]
    GradeLine {
        /// 1-based line number.
        line: usize,
        /// The offending line, trimmed.
        text: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// `[shared]` section of the settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,
}

/// `[defaults]` section of the settings file. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunDefaults {
    pub producers: Option<u32>,
    pub consumers: Option<u32>,
    pub slots: Option<u32>,
    pub items: Option<u32>,
    pub runs: Option<u32>,
    pub timeout_secs: Option<f64>,
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Whole settings file.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
///
/// [defaults]
/// producers = 4
/// timeout_secs = 1.5
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessSettings {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub defaults: RunDefaults,
}

impl HarnessSettings {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if a default slot count is 0
    /// or the default timeout is negative or not finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.slots == Some(0) {
            return Err(ConfigError::ValidationError(
                "defaults.slots must be at least 1".to_string(),
            ));
        }
        if let Some(t) = self.defaults.timeout_secs {
            validate_timeout(t)?;
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Immutable description of one configuration's runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Display name; must not contain the key separator.
    pub name: String,
    pub producers: u32,
    pub consumers: u32,
    pub slots: u32,
    pub items: u32,
    /// Time before the watchdog forces termination.
    pub timeout: Duration,
}

impl RunConfig {
    pub fn new(
        name: impl Into<String>,
        producers: u32,
        consumers: u32,
        slots: u32,
        items: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            producers,
            consumers,
            slots,
            items,
            timeout,
        }
    }

    /// Name for the `index`-th config discovered from log filenames.
    pub fn discovered_name(index: usize) -> String {
        format!("{DISCOVERED_CONFIG_PREFIX}-{index}")
    }

    /// Grouping key.
    pub const fn key(&self) -> ConfigKey {
        ConfigKey::new(self.producers, self.consumers, self.slots, self.items)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `name` is empty or contains `_`
    /// - `slots` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name(&self.name)?;
        if self.slots == 0 {
            return Err(ConfigError::ValidationError(format!(
                "config '{}' needs at least one buffer slot",
                self.name
            )));
        }
        Ok(())
    }
}

/// Config names are embedded in filenames ahead of the key, so they cannot
/// contain the key separator.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::ValidationError(
            "config name cannot be empty".to_string(),
        ));
    }
    if name.contains(KEY_SEPARATOR) {
        return Err(ConfigError::ValidationError(format!(
            "config names cannot include '{KEY_SEPARATOR}': '{name}'"
        )));
    }
    Ok(())
}

/// Timeouts are fractional seconds, finite and non-negative.
pub fn validate_timeout(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "timeout must be a non-negative number of seconds, got {secs}"
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Target out-of-order percentage used for soft warnings and scoring.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct OooTarget(f64);

impl OooTarget {
    /// Validate an explicit target.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` unless `0 < percent <= 100`.
    pub fn new(percent: f64) -> Result<Self, ConfigError> {
        if percent > 0.0 && percent <= 100.0 {
            Ok(Self(percent))
        } else {
            Err(ConfigError::ValidationError(format!(
                "out-of-order target must be greater than 0 and at most 100, got {percent}"
            )))
        }
    }

    /// Target derived from the host: 4.5% per available CPU, capped at 40%.
    pub fn for_host() -> Self {
        match std::thread::available_parallelism() {
            Ok(cpus) => Self::for_cpus(cpus.get()),
            Err(_) => Self(OOO_TARGET_FALLBACK),
        }
    }

    /// Target for a given CPU count.
    pub fn for_cpus(cpus: usize) -> Self {
        Self((OOO_TARGET_PER_CPU * cpus as f64).min(OOO_TARGET_CAP))
    }

    /// The target, in percent.
    pub const fn percent(self) -> f64 {
        self.0
    }
}

impl Default for OooTarget {
    fn default() -> Self {
        Self(OOO_TARGET_FALLBACK)
    }
}

/// Parse grade file content.
///
/// Each non-blank, non-`#` line must hold exactly
/// `name producers consumers slots items timeout_seconds`.
pub fn parse_grade_configs(content: &str) -> Result<Vec<RunConfig>, ConfigError> {
    let mut configs = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        if raw.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = raw.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        let bad_line = |reason: String| ConfigError::GradeLine {
            line,
            text: raw.trim().to_string(),
            reason,
        };

        if parts.len() != 6 {
            return Err(bad_line(format!("need 6 fields, found {}", parts.len())));
        }

        let mut numbers = [0u32; 5];
        for (slot, field) in numbers.iter_mut().zip(&parts[1..]) {
            *slot = field
                .parse()
                .map_err(|_| bad_line(format!("'{field}' is not a non-negative integer")))?;
        }
        let [producers, consumers, slots, items, timeout] = numbers;

        let config = RunConfig::new(
            parts[0],
            producers,
            consumers,
            slots,
            items,
            Duration::from_secs(u64::from(timeout)),
        );
        config.validate().map_err(|e| bad_line(e.to_string()))?;
        configs.push(config);
    }

    debug!("Parsed {} grade configurations", configs.len());
    Ok(configs)
}

/// Read and parse a grade file.
pub fn load_grade_file(path: &Path) -> Result<Vec<RunConfig>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.to_path_buf())
        } else {
            ConfigError::ParseError(format!("{}: {e}", path.display()))
        }
    })?;
    parse_grade_configs(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"warn\"").unwrap().level,
            LogLevel::Warn
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"").unwrap().level,
            LogLevel::Trace
        );
    }

    #[test]
    fn test_log_level_to_tracing() {
        assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn test_settings_loader_success() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
log_level = "debug"

[defaults]
producers = 4
timeout_secs = 0.5
output_dir = "runs"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let settings = HarnessSettings::load(file.path()).unwrap();
        assert_eq!(settings.shared.log_level, LogLevel::Debug);
        assert_eq!(settings.defaults.producers, Some(4));
        assert_eq!(settings.defaults.consumers, None);
        assert_eq!(settings.defaults.timeout_secs, Some(0.5));
        assert_eq!(settings.defaults.output_dir, Some(PathBuf::from("runs")));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_empty_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        let settings = HarnessSettings::load(file.path()).unwrap();
        assert_eq!(settings.shared.log_level, LogLevel::Info);
        assert!(settings.defaults.slots.is_none());
    }

    #[test]
    fn test_settings_unknown_default_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[defaults]\nthreads = 4").unwrap();
        let result = HarnessSettings::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_settings_zero_slots_invalid() {
        let settings = HarnessSettings {
            defaults: RunDefaults {
                slots: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = HarnessSettings::load(Path::new("/nonexistent/path/harness.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();
        let result = HarnessSettings::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_run_config_name_with_separator_rejected() {
        let config = RunConfig::new("bad_name", 1, 1, 2, 10, Duration::from_secs(1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_run_config_zero_slots_rejected() {
        let config = RunConfig::new("ok", 1, 1, 0, 10, Duration::from_secs(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discovered_names() {
        assert_eq!(RunConfig::discovered_name(1), "CONFIG-1");
        assert!(validate_name(&RunConfig::discovered_name(12)).is_ok());
    }

    #[test]
    fn test_timeout_validation() {
        assert_eq!(validate_timeout(1.5).unwrap(), Duration::from_millis(1500));
        assert!(validate_timeout(-1.0).is_err());
        assert!(validate_timeout(f64::NAN).is_err());
    }

    #[test]
    fn test_ooo_target_range() {
        assert!(OooTarget::new(0.0).is_err());
        assert!(OooTarget::new(-5.0).is_err());
        assert!(OooTarget::new(100.5).is_err());
        assert_eq!(OooTarget::new(100.0).unwrap().percent(), 100.0);
        assert_eq!(OooTarget::new(12.5).unwrap().percent(), 12.5);
    }

    #[test]
    fn test_ooo_target_for_cpus() {
        assert_eq!(OooTarget::for_cpus(2).percent(), 9.0);
        assert_eq!(OooTarget::for_cpus(64).percent(), 40.0);
        let host = OooTarget::for_host().percent();
        assert!(host > 0.0 && host <= 40.0);
    }
}
