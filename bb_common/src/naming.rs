//! Config keys and the output-log filename convention.
//!
//! Output logs are named `<config_name>_p<P>_c<C>_s<S>_i<I>[_r<R>].<ext>`.
//! When logs are analyzed without explicit metadata, the run shape is
//! recovered from the file name alone, so parsing is deliberately lenient:
//! tokens are recognized by their first letter, letters inside a token are
//! stripped before the integer parse, and anything unparsable becomes 0.

use crate::consts::{KEY_SEPARATOR, LOG_EXTENSION};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Normalized identifier used to group repeated runs of one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct ConfigKey {
    /// Producer thread count.
    pub producers: u32,
    /// Consumer thread count.
    pub consumers: u32,
    /// Buffer slot count.
    pub slots: u32,
    /// Number of input items.
    pub items: u32,
}

impl ConfigKey {
    /// Build a key from the four grouping integers.
    pub const fn new(producers: u32, consumers: u32, slots: u32, items: u32) -> Self {
        Self {
            producers,
            consumers,
            slots,
            items,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p{}_c{}_s{}_i{}",
            self.producers, self.consumers, self.slots, self.items
        )
    }
}

/// Run shape recovered from a key string or a log filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogFileMeta {
    /// Producer count (`p` token).
    pub producers: u32,
    /// Consumer count (`c` token).
    pub consumers: u32,
    /// Slot count (`s` token).
    pub slots: u32,
    /// Expected item count (`i` token).
    pub items: u32,
    /// Run number (`r` token), 0 when absent.
    pub run: u32,
}

impl LogFileMeta {
    /// The grouping key for this run.
    pub const fn key(&self) -> ConfigKey {
        ConfigKey::new(self.producers, self.consumers, self.slots, self.items)
    }
}

/// Strip ASCII letters from a token and parse what remains; 0 on failure.
pub fn token_to_int(token: &str) -> u32 {
    let digits: String = token.chars().filter(|c| !c.is_ascii_alphabetic()).collect();
    digits.parse().unwrap_or(0)
}

/// Parse the key part of a name (everything after the config name).
pub fn parse_key(key: &str) -> LogFileMeta {
    let mut meta = LogFileMeta::default();
    for part in key.split(KEY_SEPARATOR) {
        match part.chars().next() {
            Some('p') => meta.producers = token_to_int(part),
            Some('c') => meta.consumers = token_to_int(part),
            Some('s') => meta.slots = token_to_int(part),
            Some('i') => meta.items = token_to_int(part),
            Some('r') => meta.run = token_to_int(part),
            _ => {}
        }
    }
    meta
}

/// Recover run metadata from a log path.
///
/// The file stem is lower-cased and its first `_`-separated token (the
/// config name) is dropped before the key tokens are parsed.
pub fn meta_from_path(path: &Path) -> LogFileMeta {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match stem.split_once(KEY_SEPARATOR) {
        Some((_name, key)) => parse_key(key),
        None => LogFileMeta::default(),
    }
}

/// `<name>_<key>`, the common stem of input and output files.
pub fn name_and_key(name: &str, key: &ConfigKey) -> String {
    format!("{name}{KEY_SEPARATOR}{key}")
}

/// Input file path for a configuration: `<dir>/<name>_<key>.txt`.
pub fn input_path(dir: &Path, name: &str, key: &ConfigKey) -> PathBuf {
    dir.join(format!("{}.{LOG_EXTENSION}", name_and_key(name, key)))
}

/// Output log path for one run: `<dir>/<name>_<key>_r<run>.txt`.
pub fn output_path(dir: &Path, name: &str, key: &ConfigKey, run: u32) -> PathBuf {
    dir.join(format!(
        "{}{KEY_SEPARATOR}r{run}.{LOG_EXTENSION}",
        name_and_key(name, key)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display() {
        assert_eq!(ConfigKey::new(3, 1, 10, 100).to_string(), "p3_c1_s10_i100");
    }

    #[test]
    fn token_strips_letters() {
        assert_eq!(token_to_int("p3"), 3);
        assert_eq!(token_to_int("prod12"), 12);
        assert_eq!(token_to_int("i100x"), 100);
        assert_eq!(token_to_int("s"), 0);
        assert_eq!(token_to_int("c1-2"), 0);
    }

    #[test]
    fn parse_key_by_first_letter() {
        let meta = parse_key("prod4_cons2_slots7_items57_run3");
        assert_eq!(
            meta,
            LogFileMeta {
                producers: 4,
                consumers: 2,
                slots: 7,
                items: 57,
                run: 3
            }
        );
    }

    #[test]
    fn meta_from_output_path() {
        let path = Path::new("output/Grade-Sample01_p3_c1_s7_i57_r2.txt");
        let meta = meta_from_path(path);
        assert_eq!(meta.key(), ConfigKey::new(3, 1, 7, 57));
        assert_eq!(meta.run, 2);
    }

    #[test]
    fn meta_without_run_token() {
        let meta = meta_from_path(Path::new("CMD-LINE_p2_c2_s5_i10.txt"));
        assert_eq!(meta.key(), ConfigKey::new(2, 2, 5, 10));
        assert_eq!(meta.run, 0);
    }

    #[test]
    fn meta_is_case_insensitive() {
        let meta = meta_from_path(Path::new("NAME_P3_C1_S10_I100_R1.TXT"));
        assert_eq!(meta.key(), ConfigKey::new(3, 1, 10, 100));
        assert_eq!(meta.run, 1);
    }

    #[test]
    fn meta_unstructured_name_is_zero() {
        assert_eq!(meta_from_path(Path::new("random.txt")), LogFileMeta::default());
    }

    #[test]
    fn paths_follow_convention() {
        let key = ConfigKey::new(3, 1, 10, 100);
        assert_eq!(
            input_path(Path::new("input"), "CMD-LINE", &key),
            PathBuf::from("input/CMD-LINE_p3_c1_s10_i100.txt")
        );
        assert_eq!(
            output_path(Path::new("output"), "CMD-LINE", &key, 4),
            PathBuf::from("output/CMD-LINE_p3_c1_s10_i100_r4.txt")
        );
    }

    #[test]
    fn output_path_round_trips_through_meta() {
        let key = ConfigKey::new(5, 3, 2, 1000);
        let meta = meta_from_path(&output_path(Path::new("out"), "X", &key, 9));
        assert_eq!(meta.key(), key);
        assert_eq!(meta.run, 9);
    }
}
