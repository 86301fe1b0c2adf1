//! Config registry and per-config run aggregation.
//!
//! Runs are grouped by [`ConfigKey`]. The registry is an ordinary value owned
//! by the caller; two registries never share groups.

use crate::analyzer::{self, RunAnalysis};
use crate::error::HarnessResult;
use bb_common::config::{ConfigError, RunConfig};
use bb_common::naming::{self, ConfigKey};
use bb_common::stats::RunStats;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

/// One analyzed run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub path: PathBuf,
    pub analysis: RunAnalysis,
    pub stats: RunStats,
}

#[derive(Debug, Clone)]
struct QueuedRun {
    path: PathBuf,
    killed: bool,
}

/// A configuration and every run added to it.
#[derive(Debug, Clone)]
pub struct ConfigGroup {
    config: RunConfig,
    runs: Vec<RunResult>,
    queue: Vec<QueuedRun>,
    total: RunStats,
}

impl ConfigGroup {
    fn new(config: RunConfig) -> Self {
        Self {
            config,
            runs: Vec::new(),
            queue: Vec::new(),
            total: RunStats::default(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn key(&self) -> ConfigKey {
        self.config.key()
    }

    pub fn runs(&self) -> &[RunResult] {
        &self.runs
    }

    /// Sum of all added runs.
    pub fn total(&self) -> RunStats {
        self.total
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Analyze `path` and fold it into this group.
    ///
    /// `killed` is what the caller already knows; a sentinel in the log also
    /// marks the run killed.
    pub fn add_run(&mut self, path: &Path, killed: bool) -> HarnessResult<&RunResult> {
        let analysis = analyzer::analyze_file(path, killed)?;
        Ok(self.push(path.to_path_buf(), analysis))
    }

    /// Fold an already computed analysis into this group.
    pub fn add_analysis(&mut self, path: PathBuf, analysis: RunAnalysis) -> &RunResult {
        self.push(path, analysis)
    }

    fn push(&mut self, path: PathBuf, analysis: RunAnalysis) -> &RunResult {
        let stats = analysis.stats();
        self.total += stats;
        self.runs.push(RunResult {
            path,
            analysis,
            stats,
        });
        let index = self.runs.len() - 1;
        &self.runs[index]
    }

    /// Remember a log to analyze later with [`process_queued`](Self::process_queued).
    pub fn queue_run(&mut self, path: PathBuf, killed: bool) {
        self.queue.push(QueuedRun { path, killed });
    }

    /// Analyze every queued log in queue order, calling `on_run` after each.
    ///
    /// A log that cannot be read is reported and skipped. Returns the number
    /// of runs added.
    pub fn process_queued(&mut self, mut on_run: impl FnMut(&ConfigGroup, &RunResult)) -> usize {
        let queue = std::mem::take(&mut self.queue);
        let mut added = 0;
        for QueuedRun { path, killed } in queue {
            match analyzer::analyze_file(&path, killed) {
                Ok(analysis) => {
                    self.push(path, analysis);
                    added += 1;
                    if let Some(run) = self.runs.last() {
                        on_run(self, run);
                    }
                }
                Err(e) => error!("Skipping {}: {e}", path.display()),
            }
        }
        added
    }
}

/// All configurations of one harness invocation, by key.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    groups: BTreeMap<ConfigKey, ConfigGroup>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` if the config is invalid or its key is
    /// already registered.
    pub fn register(&mut self, config: RunConfig) -> Result<&mut ConfigGroup, ConfigError> {
        config.validate()?;
        match self.groups.entry(config.key()) {
            Entry::Occupied(existing) => Err(ConfigError::ValidationError(format!(
                "config '{}' has the same key {} as config '{}'",
                config.name,
                existing.key(),
                existing.get().config.name
            ))),
            Entry::Vacant(slot) => {
                debug!("Registered config '{}' ({})", config.name, config.key());
                Ok(slot.insert(ConfigGroup::new(config)))
            }
        }
    }

    /// Find or create the group a log file belongs to, by filename.
    ///
    /// New groups are named `CONFIG-<n>` in discovery order.
    pub fn for_log_file(&mut self, path: &Path, timeout: Duration) -> &mut ConfigGroup {
        let meta = naming::meta_from_path(path);
        let next_index = self.groups.len() + 1;
        self.groups.entry(meta.key()).or_insert_with(|| {
            let config = RunConfig::new(
                RunConfig::discovered_name(next_index),
                meta.producers,
                meta.consumers,
                meta.slots,
                meta.items,
                timeout,
            );
            debug!("Discovered config '{}' ({})", config.name, config.key());
            ConfigGroup::new(config)
        })
    }

    /// Queue `path` on the group its filename maps to.
    pub fn queue_log_file(&mut self, path: PathBuf, timeout: Duration) {
        self.for_log_file(&path, timeout).queue_run(path, false);
    }

    /// Process every group's queue in key order.
    pub fn process_queued(&mut self, mut on_run: impl FnMut(&ConfigGroup, &RunResult)) -> usize {
        self.groups
            .values_mut()
            .map(|group| group.process_queued(&mut on_run))
            .sum()
    }

    pub fn get(&self, key: &ConfigKey) -> Option<&ConfigGroup> {
        self.groups.get(key)
    }

    pub fn get_mut(&mut self, key: &ConfigKey) -> Option<&mut ConfigGroup> {
        self.groups.get_mut(key)
    }

    /// Groups in key order.
    pub fn groups(&self) -> impl Iterator<Item = &ConfigGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum of every group's runs.
    pub fn overall(&self) -> RunStats {
        self.groups.values().map(ConfigGroup::total).sum()
    }
}
