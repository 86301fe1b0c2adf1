//! Harness sessions: a sweep of orchestrated runs, or analysis of existing
//! logs. Reports are written to the supplied sink as work progresses.

use crate::aggregator::ConfigRegistry;
use crate::error::{HarnessError, HarnessResult};
use crate::orchestrator::RunOrchestrator;
use crate::report;
use bb_common::config::{OooTarget, RunConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{error, info, warn};

/// Parameters shared by every configuration of a sweep.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Runs per configuration.
    pub runs: u32,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub target: OooTarget,
}

fn emit(out: &mut impl Write, text: &str) -> HarnessResult<()> {
    writeln!(out, "{text}").map_err(|e| HarnessError::io("<report output>", e))
}

/// Run every configuration `options.runs` times and analyze each log.
///
/// All configurations are registered before the first run, so a bad or
/// duplicate configuration aborts the sweep without running anything. A run
/// that cannot be set up or analyzed is logged and skipped. An interrupt that
/// arrives between runs ends the sweep early; the runs done so far are still
/// returned.
pub fn run_configs(
    orchestrator: &RunOrchestrator,
    configs: Vec<RunConfig>,
    options: &SweepOptions,
    out: &mut impl Write,
) -> HarnessResult<ConfigRegistry> {
    let mut registry = ConfigRegistry::new();
    let mut keys = Vec::with_capacity(configs.len());
    for config in configs {
        keys.push(config.key());
        registry.register(config)?;
    }

    let target = options.target.percent();
    let interrupt = orchestrator.interrupt_flag();
    let mut test_number = 1;

    'configs: for key in keys {
        let Some(group) = registry.get_mut(&key) else {
            continue;
        };
        let config = group.config().clone();
        let input_path = match orchestrator.prepare_input(&config, &options.input_dir) {
            Ok(path) => path,
            Err(e) => {
                error!("Skipping config '{}': {}", config.name, e);
                continue;
            }
        };

        for run in 1..=options.runs {
            if interrupt.swap(false, Ordering::SeqCst) {
                warn!("Interrupted between runs; skipping the remaining runs");
                break 'configs;
            }
            emit(out, &report::run_header(test_number, &config.name, run))?;
            test_number += 1;

            let outcome = match orchestrator.run(&config, run, &input_path, &options.output_dir) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Run {} of '{}' failed: {}", run, config.name, e);
                    continue;
                }
            };
            if let Some(reason) = outcome.killed {
                info!(
                    "Run {} of '{}' killed ({reason}); analyze it later with -A {}",
                    run,
                    config.name,
                    outcome.output_path.display()
                );
            }

            emit(out, &report::analyzing_header(group, &outcome.output_path))?;
            match group.add_run(&outcome.output_path, outcome.was_killed()) {
                Ok(result) => emit(out, &report::run_details(result, target))?,
                Err(e) => error!("Cannot analyze {}: {}", outcome.output_path.display(), e),
            }
            emit(out, report::SECTION_END)?;
        }
        if group.runs().len() > 1 {
            emit(out, &report::config_summary(group, target, false))?;
        }
    }

    Ok(registry)
}

/// Analyze existing logs, grouping them by the configuration in their names.
pub fn analyze_files(
    files: Vec<PathBuf>,
    timeout: Duration,
    target: OooTarget,
    out: &mut impl Write,
) -> HarnessResult<ConfigRegistry> {
    let mut registry = ConfigRegistry::new();
    for path in files {
        registry.queue_log_file(path, timeout);
    }

    let target = target.percent();
    let mut failure = None;
    let keys: Vec<_> = registry.groups().map(|g| g.key()).collect();
    for key in keys {
        let Some(group) = registry.get_mut(&key) else {
            continue;
        };
        group.process_queued(|group, run| {
            let text = format!(
                "{}\n{}\n{}\n{}",
                report::SECTION_START,
                report::analyzing_header(group, &run.path),
                report::run_details(run, target),
                report::SECTION_END
            );
            if let Err(e) = emit(out, &text)
                && failure.is_none()
            {
                failure = Some(e);
            }
        });
        if !group.runs().is_empty() {
            emit(out, &report::config_summary(group, target, false))?;
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }

    Ok(registry)
}

/// Overall summaries, the sample score and the target footer.
pub fn final_report(registry: &ConfigRegistry, target: OooTarget, overridden: bool, location: &str) -> String {
    let mut text = report::overall_summary(registry, target.percent());
    text.push_str(&report::sample_score(&registry.overall(), target.percent(), location));
    text.push_str(&format!(
        "\n\n\nUsed Target OOO = {:5.2}%.  {}",
        target.percent(),
        if overridden {
            ""
        } else {
            "(You can override this target via the -o parameter.)"
        }
    ));
    text
}
