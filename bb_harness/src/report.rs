//! Text and JSON reports.
//!
//! Every function returns the rendered text; the binary decides where it
//! goes. Percentages are printed with two decimals, error lines carry a
//! `<<< ERROR` suffix, and one-line summaries mark errors with `*` and an
//! out-of-order rate below target with `L`.

use crate::aggregator::{ConfigGroup, ConfigRegistry, RunResult};
use crate::error::{HarnessError, HarnessResult};
use bb_common::stats::{RunStats, Stat};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const ERROR_ZERO: &str = "  <<< ERROR:   Should be zero";
const ERROR_HUNDRED: &str = "  <<< ERROR:   Should be 100%";
const ERROR_STAR: &str = "  <<< ERROR:   Issues marked with a *";
const IDLE_PRODUCER_ERROR: &str = "  <<< ERROR:   Idle producer";
const IDLE_CONSUMER_ERROR: &str = "  <<< ERROR:   Idle consumer";
const ERROR_TRUE: &str = "  <<< ERROR:   Should be TRUE";
const ERROR_FALSE: &str = "  <<< ERROR:   Should be FALSE";
const KILL_NOTICE: &str = "  (Note: Test KILLED.)";

const RULE: &str = "--------------------------------------------------------------------------------------------------";
const WIDE_RULE: &str = "===========================================================================================================================================================================================";
const SCORE_RULE: &str = "---------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------";

pub const SECTION_START: &str = "\n\n\n********************************************************************************************************";
pub const SECTION_END: &str = "********************************************************************************************************\n\n";

const LABEL_WIDTH: usize = 20;
const DETAIL_DELTA: usize = 4;

/// `text:` left-aligned in a column of `width`.
pub fn label(text: &str, width: usize) -> String {
    format!("{:<width$}", format!("{text}:"))
}

fn label_plain(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

/// Header printed before a run's worker output.
pub fn run_header(test_number: u32, config_name: &str, run: u32) -> String {
    format!(
        "{SECTION_START}\n{} > {config_name} <   (run {run})",
        label(&format!("Test-{test_number}"), LABEL_WIDTH)
    )
}

/// Lines naming the config and file about to be analyzed.
pub fn analyzing_header(group: &ConfigGroup, path: &Path) -> String {
    format!(
        "{} key = {}\n{} {}",
        label_plain(&format!("> {} <", group.config().name), LABEL_WIDTH),
        group.key(),
        label("Analyzing", LABEL_WIDTH),
        path.display()
    )
}

/// `( count / base )` with widths shared by every statistic of `stats`.
fn count_of_base(stats: &RunStats, stat: Stat) -> String {
    let shown = [
        stats.idle_producers,
        stats.idle_consumers,
        stats.missing,
        stats.duplicates,
        stats.invalid,
        stats.ooo,
        stats.ooo_not_zero,
        stats.killed,
    ];
    let count_width = shown.iter().map(|s| s.count).max().unwrap_or(0).to_string().len();
    let base_width = shown.iter().map(|s| s.base).max().unwrap_or(0).to_string().len();
    format!(
        "( {:>count_width$} / {:>base_width$} )",
        stat.count, stat.base
    )
}

/// The main statistics block of a run or an aggregate.
///
/// `overall` switches the out-of-order message from a warning to an error,
/// as used for the cross-config results.
pub fn main_data(stats: &RunStats, expected: Option<u64>, target: f64, overall: bool) -> String {
    let width = LABEL_WIDTH - DETAIL_DELTA;
    let nonzero = |stat: Stat| if stat.percent() > 0.0 { ERROR_ZERO } else { "" };
    let hundred = |stat: Stat| if stat.percent() != 100.0 { ERROR_HUNDRED } else { "" };
    let ooo_note = if !stats.ooo_below_target(target) {
        String::new()
    } else if overall {
        format!("  <<< ERROR:   Out of Order target average is {target:.1}%")
    } else {
        format!(
            "  <<< WARNING: OOO Low, target is {target:.1}%.  Corresponding one-line summaries marked with 'L' but not as bad."
        )
    };

    let mut out = String::new();
    if let Some(expected) = expected {
        out.push_str(&format!("{}{expected:8}\n", label("Num Expected", width)));
    }
    let rows = [
        ("Missing Items", stats.missing, nonzero(stats.missing)),
        ("Duplicates", stats.duplicates, nonzero(stats.duplicates)),
        ("Invalid", stats.invalid, nonzero(stats.invalid)),
        ("Idle Producers", stats.idle_producers, nonzero(stats.idle_producers)),
        ("Idle Consumers", stats.idle_consumers, nonzero(stats.idle_consumers)),
        ("OOO Average", stats.ooo, ooo_note.as_str()),
        ("OOO Not Zero", stats.ooo_not_zero, hundred(stats.ooo_not_zero)),
    ];
    for (name, stat, note) in rows {
        out.push_str(&format!("{}\n", stat_line(stats, name, stat, note)));
    }

    if stats.runs == 1 {
        let killed = stats.any_killed();
        let clean = stats.clean_runs.percent() == 100.0;
        out.push_str(&format!(
            "{}      {:<5}  {}\n",
            label("Test Killed", width),
            killed,
            if killed { ERROR_FALSE } else { " " }
        ));
        out.push_str(&format!(
            "{}      {:<5}  {}",
            label("Clean Test", width),
            clean,
            if clean { "" } else { ERROR_TRUE }
        ));
    } else {
        out.push_str(&format!(
            "{}\n",
            stat_line(stats, "Killed Tests", stats.killed, nonzero(stats.killed))
        ));
        out.push_str(&stat_line(
            stats,
            "Clean Tests",
            stats.clean_runs,
            hundred(stats.clean_runs),
        ));
    }
    out
}

fn stat_line(stats: &RunStats, name: &str, stat: Stat, note: &str) -> String {
    format!(
        "{}{:11.2}%   {}  {}",
        label(name, LABEL_WIDTH - DETAIL_DELTA),
        stat.percent(),
        count_of_base(stats, stat),
        note
    )
}

/// Percent columns for idle producers, idle consumers, missing, duplicates,
/// invalid and out-of-order.
pub fn one_line_summary(stats: &RunStats, target: f64) -> String {
    let flagged = |stat: Stat| {
        let p = stat.percent();
        if p > 0.0 {
            format!("{p:10.2}% * ")
        } else {
            format!("{:>10}    ", "-")
        }
    };

    let mut out = String::new();
    for stat in [
        stats.idle_producers,
        stats.idle_consumers,
        stats.missing,
        stats.duplicates,
        stats.invalid,
    ] {
        out.push_str(&flagged(stat));
    }

    let ooo = stats.ooo.percent();
    if ooo == 0.0 {
        out.push_str(&format!("{ooo:10.2}% * "));
    } else if stats.ooo_below_target(target) {
        out.push_str(&format!("{ooo:10.2}% L "));
    } else {
        out.push_str(&format!("{ooo:10.2}%   "));
    }
    out
}

/// Trailing notice for a one-line summary.
pub fn error_notice(stats: &RunStats) -> String {
    let mut out = String::new();
    if stats.is_erroring() {
        out.push_str(ERROR_STAR);
    }
    if stats.any_killed() {
        out.push_str(KILL_NOTICE);
    }
    out
}

/// Detailed analysis of one run.
pub fn run_details(run: &RunResult, target: f64) -> String {
    let a = &run.analysis;
    let mut out = String::new();

    out.push_str(&format!(
        "{} MaxPro={}, MaxCon={}, Slots={}, Items={} (Run={})\n",
        label("File parms found", LABEL_WIDTH),
        a.max_producer,
        a.max_consumer,
        a.meta.slots,
        a.meta.items,
        a.meta.run
    ));
    if a.killed {
        out.push_str("Partial data, run terminated.\n");
    }
    out.push_str(&format!("{RULE}\n"));
    out.push_str(&format!("{} {:?}\n", label("Missing List", LABEL_WIDTH), a.missing));
    out.push_str(&format!("{RULE}\n"));
    out.push_str(&format!("{} {:?}\n", label("Duplicates List", LABEL_WIDTH), a.duplicates));
    out.push_str(&format!("{RULE}\n"));
    out.push_str(&format!("{} {:?}\n", label("Invalid List", LABEL_WIDTH), a.invalid));
    out.push_str(&format!("{RULE}\n"));
    for worker in a.producer_activity() {
        out.push_str(&format!(
            "{} {:6.2}% {}\n",
            label(&format!("producer-{}", worker.id), LABEL_WIDTH),
            worker.percent,
            if worker.is_idle() { IDLE_PRODUCER_ERROR } else { "" }
        ));
    }
    let unlisted = a.unlisted_idle_producers();
    if unlisted > 0 {
        out.push_str(&format!(
            "{} {unlisted} unseen ids up to {} {IDLE_PRODUCER_ERROR}\n",
            label("other producers", LABEL_WIDTH),
            a.max_producer
        ));
    }
    out.push_str(&format!("{RULE}\n"));
    for worker in a.consumer_activity() {
        out.push_str(&format!(
            "{} {:6.2}% {}\n",
            label(&format!("consumer-{}", worker.id), LABEL_WIDTH),
            worker.percent,
            if worker.is_idle() { IDLE_CONSUMER_ERROR } else { "" }
        ));
    }
    let unlisted = a.unlisted_idle_consumers();
    if unlisted > 0 {
        out.push_str(&format!(
            "{} {unlisted} unseen ids up to {} {IDLE_CONSUMER_ERROR}\n",
            label("other consumers", LABEL_WIDTH),
            a.max_consumer
        ));
    }
    out.push_str(&format!("{RULE}\n"));
    out.push_str(&main_data(&run.stats, Some(a.expected()), target, false));
    out
}

/// Per-config table of one-line summaries.
///
/// With `one_liners_only` the surrounding banner and the combined block are
/// left out, as used inside the overall results.
pub fn config_summary(group: &ConfigGroup, target: f64, one_liners_only: bool) -> String {
    let mut out = String::new();
    if !one_liners_only {
        out.push_str(&format!("\n\n{WIDE_RULE}\n"));
        out.push_str(&format!("Config '{}' Summary:\n", group.config().name));
        out.push_str(&format!("{WIDE_RULE}\n"));
    }

    let header = format!(
        "{:<15} {:>12} {:>13} {:>13} {:>13} {:>13} {:>13} {:>8} {}",
        group.config().name,
        "Idle_Prod",
        "Idle_Cons",
        "Missing",
        "Duplicates",
        "Invalid",
        "OutOfOrder",
        "",
        group.key()
    );
    let underline: String = header
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { '-' } else { c })
        .collect();
    out.push_str(&format!("{header}\n"));
    out.push_str(&format!("{underline}\n"));

    for (i, run) in group.runs().iter().enumerate() {
        out.push_str(&format!(
            "{} {}       {:<45}     {}\n",
            label(&format!("Test-{}", i + 1), LABEL_WIDTH - DETAIL_DELTA),
            one_line_summary(&run.stats, target),
            run.path.display().to_string(),
            error_notice(&run.stats)
        ));
    }

    if group.runs().len() > 1 && !one_liners_only {
        out.push_str(&format!("{RULE}\n"));
        out.push_str(&format!("{}\n", main_data(&group.total(), None, target, false)));
    }
    if !one_liners_only {
        out.push_str(&format!("{WIDE_RULE}\n\n\n\n\n"));
    }
    out
}

/// One-liners of every config plus the overall block, when more than one
/// config took part. Empty otherwise.
pub fn overall_summary(registry: &ConfigRegistry, target: f64) -> String {
    let mut out = String::new();
    if registry.len() <= 1 {
        return out;
    }
    out.push_str(
        "\n\n\n\nv-v-v-v-v-v-v-v-v-v-v-v-v-v       Config One-Line Summaries       v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v\n\n\n",
    );
    for group in registry.groups() {
        out.push_str(&config_summary(group, target, true));
        out.push_str("\n\n");
    }
    out.push_str(
        "\n\n\n\nv-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v        Overall Results        v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v-v\n\n",
    );
    out.push_str(&format!("{}\n", main_data(&registry.overall(), None, target, true)));
    out
}

/// One rubric item of the sample score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreLine {
    pub label: String,
    pub points: u32,
    /// Fraction of `points` earned, in `[0, 1]`.
    pub fraction: f64,
    /// Earns either all points or none.
    pub all_or_nothing: bool,
    #[serde(skip)]
    pub detail: String,
}

impl ScoreLine {
    fn scaled(label: impl Into<String>, points: u32, fraction: f64, detail: String) -> Self {
        Self {
            label: label.into(),
            points,
            fraction: fraction.clamp(0.0, 1.0),
            all_or_nothing: false,
            detail,
        }
    }

    fn all_or_nothing(label: impl Into<String>, points: u32, fraction: f64) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        Self {
            label: label.into(),
            points,
            fraction: if fraction < 1.0 { 0.0 } else { 1.0 },
            all_or_nothing: true,
            detail: String::new(),
        }
    }

    pub fn earned(&self) -> f64 {
        f64::from(self.points) * self.fraction
    }
}

/// Sample grade of a set of runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleScore {
    pub target: f64,
    pub lines: Vec<ScoreLine>,
}

impl SampleScore {
    /// Score `stats` against an out-of-order `target` percent.
    ///
    /// `None` when no run has been folded into `stats`.
    pub fn from_stats(stats: &RunStats, target: f64) -> Option<Self> {
        if stats.clean_runs.base == 0 {
            return None;
        }
        let flip = |p: f64| 1.0 - p / 100.0;
        let inverse = |name: &str, p: f64| {
            format!(
                "         ::::       100%  -   Percent {name:<40}  =       100%  - {p:7.2}%    =   {:6.2}%",
                (100.0 - p).max(0.0)
            )
        };
        let ooo = stats.ooo.percent();

        let lines = vec![
            ScoreLine::scaled(
                "Not  Missing",
                10,
                flip(stats.missing.percent()),
                inverse("Missing", stats.missing.percent()),
            ),
            ScoreLine::scaled(
                "Not  Duplicate",
                10,
                flip(stats.duplicates.percent()),
                inverse("Duplicates", stats.duplicates.percent()),
            ),
            ScoreLine::scaled(
                "Not  Invalid",
                10,
                flip(stats.invalid.percent()),
                inverse("Invalid", stats.invalid.percent()),
            ),
            ScoreLine::scaled(
                "Busy Producers",
                5,
                flip(stats.idle_producers.percent()),
                inverse("Idle Producers", stats.idle_producers.percent()),
            ),
            ScoreLine::scaled(
                "Busy Consumers",
                5,
                flip(stats.idle_consumers.percent()),
                inverse("Idle Consumers", stats.idle_consumers.percent()),
            ),
            ScoreLine::scaled(
                format!("OOO  >= {target:.1}%"),
                10,
                ooo / target,
                format!(
                    "         ::::       min(100%, OOO_Ave / OOO_Target)   =   min(100%, {ooo:6.2} / {target:5.1})   =   min(100%,   {:7.2}%)   =   {:6.2}%",
                    100.0 * ooo / target,
                    100.0 * (ooo / target).min(1.0)
                ),
            ),
            ScoreLine::scaled(
                "OOO  Not Zero",
                10,
                stats.ooo_not_zero.percent() / 100.0,
                String::new(),
            ),
            ScoreLine::all_or_nothing("No   Missing Items", 10, flip(stats.missing.percent())),
            ScoreLine::all_or_nothing("No   Duplicates", 10, flip(stats.duplicates.percent())),
            ScoreLine::all_or_nothing("No   Invalid Items", 10, flip(stats.invalid.percent())),
            ScoreLine::all_or_nothing("No   Tests Killed", 10, flip(stats.killed.percent())),
        ];
        Some(Self { target, lines })
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(ScoreLine::earned).sum()
    }

    pub fn available(&self) -> u32 {
        self.lines.iter().map(|l| l.points).sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut in_all_or_nothing = false;
        for line in &self.lines {
            if line.all_or_nothing && !in_all_or_nothing {
                out.push_str("-------------------------------------------------------\n");
                in_all_or_nothing = true;
            }
            if line.all_or_nothing {
                out.push_str(&format!(
                    "{} {:>7}   ( {:6.3} of {:3} points )   {}\n",
                    label(&line.label, LABEL_WIDTH),
                    line.fraction >= 1.0,
                    line.earned(),
                    line.points,
                    line.detail
                ));
            } else {
                out.push_str(&format!(
                    "{} {:6.2}%   ( {:6.3} of {:3} points )   {}\n",
                    label(&line.label, LABEL_WIDTH),
                    line.fraction * 100.0,
                    line.earned(),
                    line.points,
                    line.detail
                ));
            }
        }
        let total = self.total();
        let available = self.available();
        out.push_str("=======================================================\n");
        out.push_str(&format!(
            "{} {total:18.3} of {available:3} points\n",
            label("Total", LABEL_WIDTH)
        ));
        out.push_str(&format!(
            "{} {total:17.2}  of {available:3} points              ::::       Rubric deduction would be:  -{:.2} ",
            label("Rounded", LABEL_WIDTH),
            f64::from(available) - total
        ));
        out
    }
}

/// The sample score block for `stats`, including its banner.
pub fn sample_score(stats: &RunStats, target: f64, location: &str) -> String {
    let mut out = format!(
        "\n\n\n\n** SAMPLE ***  Grade of the analyzed test runs in {location}:\n{SCORE_RULE}\n"
    );
    match SampleScore::from_stats(stats, target) {
        Some(score) => out.push_str(&score.render()),
        None => out.push_str("No runs to grade.\n======================================================="),
    }
    out.push_str(&format!("\n{SCORE_RULE}"));
    out
}

#[derive(Debug, Serialize)]
struct RunEntry<'a> {
    path: &'a Path,
    stats: &'a RunStats,
}

#[derive(Debug, Serialize)]
struct ConfigEntry<'a> {
    name: &'a str,
    key: String,
    runs: Vec<RunEntry<'a>>,
    total: RunStats,
}

/// Machine-readable statistics of a whole invocation.
#[derive(Debug, Serialize)]
pub struct StatsReport<'a> {
    ooo_target: f64,
    configs: Vec<ConfigEntry<'a>>,
    overall: RunStats,
    score: Option<SampleScore>,
}

impl<'a> StatsReport<'a> {
    pub fn new(registry: &'a ConfigRegistry, target: f64) -> Self {
        let configs = registry
            .groups()
            .map(|group| ConfigEntry {
                name: &group.config().name,
                key: group.key().to_string(),
                runs: group
                    .runs()
                    .iter()
                    .map(|run| RunEntry {
                        path: &run.path,
                        stats: &run.stats,
                    })
                    .collect(),
                total: group.total(),
            })
            .collect();
        let overall = registry.overall();
        Self {
            ooo_target: target,
            configs,
            overall,
            score: SampleScore::from_stats(&overall, target),
        }
    }

    pub fn to_json(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to `path` as pretty JSON.
    pub fn write(&self, path: &Path) -> HarnessResult<PathBuf> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| HarnessError::io(path, e))?;
        Ok(path.to_path_buf())
    }
}
