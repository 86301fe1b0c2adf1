//! Count/base statistics for single runs and their aggregates.
//!
//! Every statistic is kept as a raw `(count, base)` pair and the percentage is
//! derived on demand. Aggregation adds counts and bases independently, which
//! yields a weighted average across heterogeneous runs instead of an average
//! of percentages, and makes combination associative and commutative.

use serde::{Serialize, Serializer};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// `count / base * 100`, with a zero base yielding 0.
pub fn percent(count: u64, base: u64) -> f64 {
    if base == 0 {
        0.0
    } else {
        count as f64 / base as f64 * 100.0
    }
}

/// One statistic: how many instances out of what base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    pub count: u64,
    pub base: u64,
}

impl Stat {
    pub const fn new(count: u64, base: u64) -> Self {
        Self { count, base }
    }

    /// A yes/no fact about a single run (base 1).
    pub const fn flag(set: bool) -> Self {
        Self::new(set as u64, 1)
    }

    #[inline]
    pub fn percent(&self) -> f64 {
        percent(self.count, self.base)
    }
}

impl AddAssign for Stat {
    fn add_assign(&mut self, other: Self) {
        self.count += other.count;
        self.base += other.base;
    }
}

impl Add for Stat {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl Serialize for Stat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Stat", 3)?;
        s.serialize_field("count", &self.count)?;
        s.serialize_field("base", &self.base)?;
        s.serialize_field("percent", &self.percent())?;
        s.end()
    }
}

/// Raw per-run counts produced by the log analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounts {
    /// Expected items (`1..=expected`).
    pub expected: u64,
    /// Rows processed, excluding sentinel rows.
    pub rows: u64,
    pub missing: u64,
    pub duplicates: u64,
    pub invalid: u64,
    pub out_of_order: u64,
    /// Configured producer count (base of the idle-producer statistic).
    pub producers: u64,
    pub idle_producers: u64,
    /// Configured consumer count (base of the idle-consumer statistic).
    pub consumers: u64,
    pub idle_consumers: u64,
    pub killed: bool,
}

/// Statistics for one run, or the sum of any number of runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunStats {
    /// Number of runs folded into this value.
    pub runs: u64,
    pub missing: Stat,
    pub duplicates: Stat,
    pub invalid: Stat,
    pub ooo: Stat,
    pub idle_producers: Stat,
    pub idle_consumers: Stat,
    pub killed: Stat,
    pub clean_runs: Stat,
    pub ooo_not_zero: Stat,
}

impl RunStats {
    /// Snapshot for a single run.
    pub fn for_run(counts: &RunCounts) -> Self {
        let mut stats = Self {
            runs: 1,
            missing: Stat::new(counts.missing, counts.expected),
            duplicates: Stat::new(counts.duplicates, counts.expected),
            invalid: Stat::new(counts.invalid, counts.expected),
            ooo: Stat::new(counts.out_of_order, counts.rows),
            idle_producers: Stat::new(counts.idle_producers, counts.producers),
            idle_consumers: Stat::new(counts.idle_consumers, counts.consumers),
            killed: Stat::flag(counts.killed),
            clean_runs: Stat::default(),
            ooo_not_zero: Stat::default(),
        };
        stats.ooo_not_zero = Stat::flag(stats.ooo.percent() != 0.0);
        stats.clean_runs = Stat::flag(!stats.is_erroring());
        stats
    }

    /// Hard error classification.
    ///
    /// Out-of-order is an equality test: exactly 0% is an error, any nonzero
    /// value passes. The target-based check is [`RunStats::ooo_below_target`].
    pub fn is_erroring(&self) -> bool {
        self.idle_producers.percent() > 0.0
            || self.idle_consumers.percent() > 0.0
            || self.missing.percent() > 0.0
            || self.duplicates.percent() > 0.0
            || self.invalid.percent() > 0.0
            || self.ooo.percent() == 0.0
            || self.killed.percent() > 0.0
    }

    /// Soft warning: nonzero OOO that is still below the target.
    pub fn ooo_below_target(&self, target_percent: f64) -> bool {
        self.ooo.percent() < target_percent
    }

    /// Whether any folded run was killed.
    pub fn any_killed(&self) -> bool {
        self.killed.count > 0
    }

    fn fields_mut(&mut self) -> [&mut Stat; 9] {
        [
            &mut self.missing,
            &mut self.duplicates,
            &mut self.invalid,
            &mut self.ooo,
            &mut self.idle_producers,
            &mut self.idle_consumers,
            &mut self.killed,
            &mut self.clean_runs,
            &mut self.ooo_not_zero,
        ]
    }

    /// All statistics, for column alignment in reports.
    pub fn fields(&self) -> [Stat; 9] {
        [
            self.missing,
            self.duplicates,
            self.invalid,
            self.ooo,
            self.idle_producers,
            self.idle_consumers,
            self.killed,
            self.clean_runs,
            self.ooo_not_zero,
        ]
    }
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: Self) {
        self.runs += other.runs;
        for (mine, theirs) in self.fields_mut().into_iter().zip(other.fields()) {
            *mine += theirs;
        }
    }
}

impl Add for RunStats {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl Sum for RunStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a RunStats> for RunStats {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
