//! Output log analyzer.
//!
//! Reconstructs correctness and fairness of a run from its output log
//! alone. The analysis is a pure function of the log text, the run metadata
//! and whether the caller already knows the run was killed.
//!
//! # Row handling
//!
//! | Row                          | Effect |
//! |------------------------------|--------|
//! | item < 0 (sentinel)          | marks the run killed, otherwise ignored |
//! | more than 3 fields           | counted, item coerced to 0 (invalid) |
//! | unparsable or missing field  | that field reads as 0 |
//! | bytes that are not UTF-8     | the field holding them reads as 0 |
//!
//! Producer and consumer ids are taken from every counted row, including
//! coerced ones.

use crate::error::{HarnessError, HarnessResult};
use bb_common::naming::{self, LogFileMeta};
use bb_common::stats::{RunCounts, RunStats, percent};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// One worker's share of the counted rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerActivity {
    pub id: i64,
    pub rows: u64,
    /// Percent of all counted rows.
    pub percent: f64,
}

impl WorkerActivity {
    pub fn is_idle(&self) -> bool {
        self.rows == 0
    }
}

/// Everything learned from one output log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunAnalysis {
    pub meta: LogFileMeta,
    /// Rows counted (every row except sentinels).
    pub rows: u64,
    pub out_of_order: u64,
    pub killed: bool,
    /// Highest producer id seen, at least the configured count.
    pub max_producer: i64,
    /// Highest consumer id seen, at least the configured count.
    pub max_consumer: i64,
    pub item_counts: BTreeMap<i64, u64>,
    pub producer_counts: BTreeMap<i64, u64>,
    pub consumer_counts: BTreeMap<i64, u64>,
    /// Expected items absent from the log, ascending.
    pub missing: Vec<i64>,
    /// Expected items logged more than once → occurrences.
    pub duplicates: BTreeMap<i64, u64>,
    /// Items outside `1..=expected` → occurrences.
    pub invalid: BTreeMap<i64, u64>,
    pub idle_producers: u64,
    pub idle_consumers: u64,
}

impl RunAnalysis {
    pub fn expected(&self) -> u64 {
        u64::from(self.meta.items)
    }

    pub fn num_duplicates(&self) -> u64 {
        self.duplicates.values().map(|count| count - 1).sum()
    }

    pub fn num_invalid(&self) -> u64 {
        self.invalid.values().sum()
    }

    /// Raw counts for the statistics snapshot.
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            expected: self.expected(),
            rows: self.rows,
            missing: self.missing.len() as u64,
            duplicates: self.num_duplicates(),
            invalid: self.num_invalid(),
            out_of_order: self.out_of_order,
            producers: u64::from(self.meta.producers),
            idle_producers: self.idle_producers,
            consumers: u64::from(self.meta.consumers),
            idle_consumers: self.idle_consumers,
            killed: self.killed,
        }
    }

    pub fn stats(&self) -> RunStats {
        RunStats::for_run(&self.counts())
    }

    /// Activity of the configured producers plus any other producer id
    /// seen in the log, ascending.
    pub fn producer_activity(&self) -> Vec<WorkerActivity> {
        activity(&self.producer_counts, i64::from(self.meta.producers), self.rows)
    }

    /// Activity of the configured consumers plus any other consumer id
    /// seen in the log, ascending.
    pub fn consumer_activity(&self) -> Vec<WorkerActivity> {
        activity(&self.consumer_counts, i64::from(self.meta.consumers), self.rows)
    }

    /// Idle producer ids above the configured count, which
    /// [`producer_activity`](Self::producer_activity) does not list.
    pub fn unlisted_idle_producers(&self) -> u64 {
        unlisted_idle(self.idle_producers, &self.producer_activity())
    }

    /// Idle consumer ids above the configured count, which
    /// [`consumer_activity`](Self::consumer_activity) does not list.
    pub fn unlisted_idle_consumers(&self) -> u64 {
        unlisted_idle(self.idle_consumers, &self.consumer_activity())
    }
}

fn activity(counts: &BTreeMap<i64, u64>, configured: i64, rows: u64) -> Vec<WorkerActivity> {
    let seen_above = counts
        .keys()
        .copied()
        .filter(|&id| id > configured.max(0));
    (1..=configured)
        .chain(seen_above)
        .map(|id| {
            let n = counts.get(&id).copied().unwrap_or(0);
            WorkerActivity {
                id,
                rows: n,
                percent: percent(n, rows),
            }
        })
        .collect()
}

fn unlisted_idle(idle: u64, listed: &[WorkerActivity]) -> u64 {
    let listed_idle = listed.iter().filter(|w| w.is_idle()).count() as u64;
    idle.saturating_sub(listed_idle)
}

/// Ids in `1..=max_id` with no rows.
fn idle_in_range(counts: &BTreeMap<i64, u64>, max_id: i64) -> u64 {
    if max_id < 1 {
        return 0;
    }
    let present = counts.range(1..=max_id).count() as u64;
    (max_id as u64).saturating_sub(present)
}

/// Field `index` as an integer, 0 when absent or unparsable.
fn field(parts: &[&str], index: usize) -> i64 {
    parts
        .get(index)
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0)
}

/// Whether `current`, the `row`-th counted item, breaks the ascending
/// sequence after `prev`.
///
/// The first row never does. Neither does a row after an invalid or zero
/// item, or a repeat of the previous item. An invalid item after a valid
/// one does.
pub fn is_out_of_order(prev: Option<i64>, current: i64, row: u64) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    if row <= 1 || prev <= 0 || prev == current {
        return false;
    }
    prev.checked_add(1) != Some(current)
}

/// Analyze a log read from `reader`.
pub fn analyze_reader<R: BufRead>(
    mut reader: R,
    meta: LogFileMeta,
    declared_killed: bool,
) -> io::Result<RunAnalysis> {
    let mut analysis = RunAnalysis {
        meta,
        killed: declared_killed,
        max_producer: i64::from(meta.producers),
        max_consumer: i64::from(meta.consumers),
        ..RunAnalysis::default()
    };
    let mut prev = None;
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        // Bytes that are not UTF-8 become an unparsable field.
        let line = String::from_utf8_lossy(&raw);
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mut item = field(&parts, 0);

        if item < 0 {
            analysis.killed = true;
            continue;
        }
        analysis.rows += 1;

        if parts.len() > 3 {
            item = 0;
        }
        let producer = field(&parts, 1);
        let consumer = field(&parts, 2);

        *analysis.item_counts.entry(item).or_insert(0) += 1;
        *analysis.producer_counts.entry(producer).or_insert(0) += 1;
        *analysis.consumer_counts.entry(consumer).or_insert(0) += 1;
        analysis.max_producer = analysis.max_producer.max(producer);
        analysis.max_consumer = analysis.max_consumer.max(consumer);

        if is_out_of_order(prev, item, analysis.rows) {
            analysis.out_of_order += 1;
        }
        prev = Some(item);
    }

    let expected = i64::from(meta.items);
    for item in 1..=expected {
        match analysis.item_counts.get(&item) {
            None => analysis.missing.push(item),
            Some(&count) if count > 1 => {
                analysis.duplicates.insert(item, count);
            }
            Some(_) => {}
        }
    }
    analysis.invalid = analysis
        .item_counts
        .iter()
        .filter(|(item, _)| !(1..=expected).contains(*item))
        .map(|(&item, &count)| (item, count))
        .collect();

    analysis.idle_producers = idle_in_range(&analysis.producer_counts, analysis.max_producer);
    analysis.idle_consumers = idle_in_range(&analysis.consumer_counts, analysis.max_consumer);

    Ok(analysis)
}

/// Analyze in-memory log text.
pub fn analyze_str(log: &str, meta: LogFileMeta, declared_killed: bool) -> RunAnalysis {
    match analyze_reader(log.as_bytes(), meta, declared_killed) {
        Ok(analysis) => analysis,
        // Reading from a byte slice of valid UTF-8 cannot fail.
        Err(_) => RunAnalysis {
            meta,
            killed: declared_killed,
            ..RunAnalysis::default()
        },
    }
}

/// Analyze a log file, recovering its metadata from the filename.
pub fn analyze_file(path: &Path, declared_killed: bool) -> HarnessResult<RunAnalysis> {
    analyze_file_with(path, naming::meta_from_path(path), declared_killed)
}

/// Analyze a log file with explicitly supplied metadata.
pub fn analyze_file_with(
    path: &Path,
    meta: LogFileMeta,
    declared_killed: bool,
) -> HarnessResult<RunAnalysis> {
    let file = File::open(path).map_err(|e| HarnessError::io(path, e))?;
    let analysis = analyze_reader(BufReader::new(file), meta, declared_killed)
        .map_err(|e| HarnessError::io(path, e))?;
    debug!(
        "Analyzed {}: {} rows, {} out of order, killed={}",
        path.display(),
        analysis.rows,
        analysis.out_of_order,
        analysis.killed
    );
    Ok(analysis)
}
