//! # Bounded-Buffer Harness Binary
//!
//! Runs producer/consumer configurations against the shared circular buffer,
//! analyzes every output log and prints per-run, per-config and overall
//! results with a sample score.
//!
//! # Usage
//!
//! ```bash
//! # One configuration from the command line, three runs
//! bounded_buffer -p 4 -c 2 -s 8 -i 500 -r 3
//!
//! # Every configuration of the default grade file
//! bounded_buffer -g
//!
//! # Re-analyze existing logs only
//! bounded_buffer -A 'output/*p3*'
//!
//! # Yielding workers, verbose logging
//! bounded_buffer --strategy yield -v
//! ```

use bb_buffer::{DEFAULT_STRATEGY, StrategyRegistry};
use bb_common::config::{
    ConfigLoader, HarnessSettings, LogLevel, OooTarget, RunConfig, load_grade_file,
    validate_timeout,
};
use bb_common::consts::*;
use bb_harness::report::StatsReport;
use bb_harness::session::{self, SweepOptions};
use bb_harness::{ConfigRegistry, RunOrchestrator, pattern};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status after a second interrupt that the active run has not yet seen.
const FORCED_EXIT_STATUS: i32 = 130;

/// Bounded-buffer producer/consumer harness and grader
#[derive(Parser, Debug)]
#[command(name = "bounded_buffer")]
#[command(version)]
#[command(about = "Runs, analyzes and grades bounded-buffer producer/consumer configurations")]
#[command(long_about = None)]
struct Args {
    /// Number of producers
    #[arg(short, long, value_name = "#")]
    producers: Option<u32>,

    /// Number of consumers
    #[arg(short, long, value_name = "#")]
    consumers: Option<u32>,

    /// Number of buffer slots (one is always kept free)
    #[arg(short, long, value_name = "#")]
    slots: Option<u32>,

    /// Number of items to move through the buffer
    #[arg(short, long, value_name = "#")]
    items: Option<u32>,

    /// Runs per configuration
    #[arg(short, long, value_name = "#")]
    runs: Option<u32>,

    /// Seconds before a run is killed (fractional)
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<f64>,

    /// Name of the command-line configuration (no '_')
    #[arg(short, long, default_value = DEFAULT_CONFIG_NAME)]
    name: String,

    /// Target out-of-order percentage (0 < target <= 100)
    #[arg(short = 'o', long = "out-of-order", value_name = "PERCENT")]
    out_of_order: Option<f64>,

    /// Run every configuration of the default grade file
    #[arg(short = 'g', long)]
    grade: bool,

    /// Run every configuration of the given grade file
    #[arg(short = 'G', long, value_name = "PATH")]
    grade_file: Option<PathBuf>,

    /// Analyze existing logs matching the default pattern, run nothing
    #[arg(short = 'a', long)]
    analyze: bool,

    /// Analyze existing logs matching PATTERN, run nothing
    #[arg(short = 'A', long, value_name = "PATTERN")]
    analyze_glob: Option<String>,

    /// Producer strategy
    #[arg(long, value_name = "NAME")]
    producer_strategy: Option<String>,

    /// Consumer strategy
    #[arg(long, value_name = "NAME")]
    consumer_strategy: Option<String>,

    /// Strategy for both producers and consumers
    #[arg(long, value_name = "NAME")]
    strategy: Option<String>,

    /// List the available worker strategies and exit
    #[arg(short = 'l', long)]
    list_strategies: bool,

    /// TOML settings file with logging and run defaults
    #[arg(long, value_name = "TOML")]
    settings: Option<PathBuf>,

    /// Directory for generated input files
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,

    /// Directory for output logs
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Also write per-config and overall statistics as JSON
    #[arg(long, value_name = "PATH")]
    stats_json: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("Harness failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => HarnessSettings::load(path),
        None => Ok(HarnessSettings::default()),
    };
    let level = match &settings {
        Ok(s) => s.shared.log_level,
        Err(_) => LogLevel::default(),
    };
    setup_tracing(&args, level);
    let settings = settings?;
    settings.validate()?;

    info!("bounded_buffer v{} starting", env!("CARGO_PKG_VERSION"));

    let strategies = StrategyRegistry::with_builtin();
    if args.list_strategies {
        for name in strategies.names() {
            let strategy = strategies.create(name)?;
            println!("{:<8} {}", name, strategy.description());
        }
        return Ok(());
    }

    let overridden = args.out_of_order.is_some();
    let target = match args.out_of_order {
        Some(percent) => OooTarget::new(percent)?,
        None => OooTarget::for_host(),
    };
    info!("Out-of-order target {:.2}%", target.percent());

    let defaults = &settings.defaults;
    let timeout = validate_timeout(
        args.timeout
            .or(defaults.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    )?;

    let registry = if args.analyze || args.analyze_glob.is_some() {
        let pattern = args
            .analyze_glob
            .as_deref()
            .unwrap_or(DEFAULT_ANALYZE_PATTERN);
        let files = pattern::expand(pattern)?;
        if files.is_empty() {
            warn!("No files match '{}'", pattern);
        } else {
            info!("Analyzing {} files matching '{}'", files.len(), pattern);
        }
        session::analyze_files(files, timeout, target, &mut std::io::stdout().lock())?
    } else {
        let configs = if let Some(path) = &args.grade_file {
            load_grade_file(path)?
        } else if args.grade {
            load_grade_file(Path::new(DEFAULT_GRADE_FILE))?
        } else {
            vec![RunConfig::new(
                args.name.clone(),
                args.producers.or(defaults.producers).unwrap_or(DEFAULT_PRODUCERS),
                args.consumers.or(defaults.consumers).unwrap_or(DEFAULT_CONSUMERS),
                args.slots.or(defaults.slots).unwrap_or(DEFAULT_SLOTS),
                args.items.or(defaults.items).unwrap_or(DEFAULT_ITEMS),
                timeout,
            )]
        };

        let both = args.strategy.as_deref().unwrap_or(DEFAULT_STRATEGY);
        let producer = args.producer_strategy.as_deref().unwrap_or(both);
        let consumer = args.consumer_strategy.as_deref().unwrap_or(both);
        let orchestrator = RunOrchestrator::new(strategies.create(producer)?, strategies.create(consumer)?);
        info!("Strategies: producers '{}', consumers '{}'", producer, consumer);

        let interrupt = orchestrator.interrupt_flag();
        ctrlc::set_handler(move || {
            if interrupt.swap(true, Ordering::SeqCst) {
                error!("Second interrupt before the run stopped, exiting");
                std::process::exit(FORCED_EXIT_STATUS);
            }
            warn!("Interrupt received, killing the active run");
        })?;

        let options = SweepOptions {
            runs: args.runs.or(defaults.runs).unwrap_or(DEFAULT_RUNS),
            input_dir: args
                .input_dir
                .clone()
                .or_else(|| defaults.input_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR)),
            output_dir: args
                .output_dir
                .clone()
                .or_else(|| defaults.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            target,
        };
        session::run_configs(&orchestrator, configs, &options, &mut std::io::stdout().lock())?
    };

    finish(&registry, target, overridden, args.stats_json.as_deref())?;
    if args.analyze || args.analyze_glob.is_some() {
        println!("\nProgram Use Terminated -- Analysis Only.");
    }

    info!("bounded_buffer finished");
    Ok(())
}

/// Print the overall results and score, and write the JSON stats if asked.
fn finish(
    registry: &ConfigRegistry,
    target: OooTarget,
    overridden: bool,
    stats_json: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let location = std::env::current_dir()
        .ok()
        .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| ".".to_string());

    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "{}",
        session::final_report(registry, target, overridden, &location)
    )?;

    if let Some(path) = stats_json {
        let written = StatsReport::new(registry, target.percent()).write(path)?;
        info!("Statistics written to {}", written.display());
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(level)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
