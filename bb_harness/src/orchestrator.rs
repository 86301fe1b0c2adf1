//! Run orchestrator.
//!
//! One call to [`RunOrchestrator::run`] executes one run of a configuration:
//!
//! 1. Open the input file and create the output log
//! 2. Start producers and consumers (order alternates with run parity)
//!    plus the watchdog
//! 3. Join producers, set `PRODUCERS_DONE`
//! 4. Join consumers, set `CONSUMERS_DONE`
//! 5. Stop the watchdog, close the log
//!
//! Timeouts and interrupts do not change this sequence; they only set `KILL`
//! early so the workers return sooner.

use crate::error::{HarnessError, HarnessResult};
use crate::lifecycle::{RunEvent, RunLifecycle};
use crate::watchdog::{KillReason, Watchdog, kill_run};
use bb_buffer::{
    BoundedBuffer, InputStream, LockSet, OutputLog, Role, WorkerContext, WorkerError,
    WorkerReport, WorkerStrategy,
};
use bb_common::config::RunConfig;
use bb_common::naming;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Scope, ScopedJoinHandle};
use tracing::{debug, error, info};

/// What happened during one run.
#[derive(Debug)]
pub struct RunOutcome {
    pub config: RunConfig,
    /// 1-based run number within the configuration.
    pub run_index: u32,
    pub output_path: PathBuf,
    /// Set when the run was forcibly terminated.
    pub killed: Option<KillReason>,
    /// Reports from workers that returned normally.
    pub reports: Vec<WorkerReport>,
    /// Worker I/O faults, spawn failures and panics.
    pub faults: Vec<WorkerError>,
}

impl RunOutcome {
    pub fn was_killed(&self) -> bool {
        self.killed.is_some()
    }

    /// Items moved by all workers of one class.
    pub fn items_moved(&self, role: Role) -> u64 {
        self.reports
            .iter()
            .filter(|r| r.role == role)
            .map(|r| r.items)
            .sum()
    }
}

type WorkerHandle<'scope> = (u32, ScopedJoinHandle<'scope, Result<WorkerReport, WorkerError>>);

/// Executes runs with a fixed pair of worker strategies.
pub struct RunOrchestrator {
    producer: Box<dyn WorkerStrategy>,
    consumer: Box<dyn WorkerStrategy>,
    interrupt: Arc<AtomicBool>,
}

impl RunOrchestrator {
    pub fn new(producer: Box<dyn WorkerStrategy>, consumer: Box<dyn WorkerStrategy>) -> Self {
        Self {
            producer,
            consumer,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag an operator interrupt handler sets to stop the active run.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn producer_strategy(&self) -> &dyn WorkerStrategy {
        self.producer.as_ref()
    }

    pub fn consumer_strategy(&self) -> &dyn WorkerStrategy {
        self.consumer.as_ref()
    }

    /// Write `<input_dir>/<name>_<key>.txt` holding `1..=items`.
    pub fn prepare_input(&self, config: &RunConfig, input_dir: &Path) -> HarnessResult<PathBuf> {
        fs::create_dir_all(input_dir).map_err(|e| HarnessError::io(input_dir, e))?;
        let path = naming::input_path(input_dir, &config.name, &config.key());

        let file = File::create(&path).map_err(|e| HarnessError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        for item in 1..=config.items {
            writeln!(writer, "{item}").map_err(|e| HarnessError::io(&path, e))?;
        }
        writer.flush().map_err(|e| HarnessError::io(&path, e))?;

        debug!("Wrote {} items to {}", config.items, path.display());
        Ok(path)
    }

    /// Execute run `run_index` of `config`, reading `input_path` and
    /// writing its log under `output_dir`.
    ///
    /// # Errors
    ///
    /// Only setup failures (files, buffer, watchdog thread) are returned.
    /// Worker faults end up in [`RunOutcome::faults`].
    pub fn run(
        &self,
        config: &RunConfig,
        run_index: u32,
        input_path: &Path,
        output_dir: &Path,
    ) -> HarnessResult<RunOutcome> {
        fs::create_dir_all(output_dir).map_err(|e| HarnessError::io(output_dir, e))?;
        let output_path = naming::output_path(output_dir, &config.name, &config.key(), run_index);

        let input = File::open(input_path).map_err(|e| HarnessError::io(input_path, e))?;
        let output = File::create(&output_path).map_err(|e| HarnessError::io(&output_path, e))?;

        let buffer = BoundedBuffer::new(config.slots as usize)?;
        let locks = LockSet::new(
            InputStream::new(BufReader::new(input)),
            OutputLog::new(BufWriter::new(output)),
        );
        let ctx = WorkerContext::new(&buffer, &locks);
        let watchdog = Watchdog::new();
        let mut lifecycle = RunLifecycle::new();

        let producers_first = run_index % 2 == 1;
        let mut reports = Vec::new();
        let mut faults = Vec::new();

        let killed = thread::scope(|scope| -> HarnessResult<Option<KillReason>> {
            let watchdog_handle = thread::Builder::new()
                .name("Watchdog".to_string())
                .spawn_scoped(scope, || {
                    watchdog.watch(config.timeout, &self.interrupt, &buffer, &locks)
                })
                .map_err(|e| HarnessError::Lifecycle(format!("failed to start watchdog: {e}")))?;
            lifecycle.advance(RunEvent::Start)?;

            let (producers, consumers) = if producers_first {
                let p = self.spawn_workers(scope, Role::Producer, config.producers, ctx, &mut faults);
                let c = self.spawn_workers(scope, Role::Consumer, config.consumers, ctx, &mut faults);
                (p, c)
            } else {
                let c = self.spawn_workers(scope, Role::Consumer, config.consumers, ctx, &mut faults);
                let p = self.spawn_workers(scope, Role::Producer, config.producers, ctx, &mut faults);
                (p, c)
            };
            let aborted = !faults.is_empty();

            join_workers(producers, Role::Producer, &mut reports, &mut faults);
            buffer.flags().set_producers_done();
            lifecycle.advance(RunEvent::ProducersFinished)?;
            info!("Producers done.");

            join_workers(consumers, Role::Consumer, &mut reports, &mut faults);
            buffer.flags().set_consumers_done();
            lifecycle.advance(RunEvent::ConsumersFinished)?;
            info!("Consumers done.");

            watchdog.stop();
            let reason = match watchdog_handle.join() {
                Ok(reason) => reason,
                Err(_) => {
                    error!("Watchdog thread panicked");
                    None
                }
            };
            Ok(reason.or_else(|| aborted.then_some(KillReason::Aborted)))
        })?;

        let killed = killed.or_else(|| buffer.flags().is_killed().then_some(KillReason::Aborted));
        if killed.is_some() {
            // Retries the sentinel if the watchdog's write failed.
            kill_run(&buffer, &locks);
            // A second Ctrl-C during the drain belongs to this run too.
            self.interrupt.store(false, Ordering::SeqCst);
        }

        if let Err(e) = locks.output.lock().close() {
            error!("Failed to close {}: {e}", output_path.display());
        }
        lifecycle.advance(RunEvent::LogClosed)?;

        for fault in &faults {
            error!("Run {} of {}: {fault}", run_index, config.name);
        }

        Ok(RunOutcome {
            config: config.clone(),
            run_index,
            output_path,
            killed,
            reports,
            faults,
        })
    }

    fn spawn_workers<'scope, 'env>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        role: Role,
        count: u32,
        ctx: WorkerContext<'env>,
        faults: &mut Vec<WorkerError>,
    ) -> Vec<WorkerHandle<'scope>> {
        let strategy = match role {
            Role::Producer => self.producer.as_ref(),
            Role::Consumer => self.consumer.as_ref(),
        };
        info!("Starting {} {}s using '{}' ...", count, role, strategy.name());

        let mut handles = Vec::with_capacity(count as usize);
        for id in 1..=count {
            let spawned = thread::Builder::new()
                .name(format!("{role}-{id}"))
                .spawn_scoped(scope, move || match role {
                    Role::Producer => strategy.produce(id, &ctx),
                    Role::Consumer => strategy.consume(id, &ctx),
                });
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(source) => {
                    faults.push(WorkerError::Spawn { role, id, source });
                    // Workers already running must not wait on a class that
                    // will never complete.
                    ctx.buffer.flags().request_kill();
                    break;
                }
            }
        }
        handles
    }
}

fn join_workers(
    handles: Vec<WorkerHandle<'_>>,
    role: Role,
    reports: &mut Vec<WorkerReport>,
    faults: &mut Vec<WorkerError>,
) {
    for (id, handle) in handles {
        match handle.join() {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(e)) => faults.push(e),
            Err(_) => faults.push(WorkerError::Panicked { role, id }),
        }
    }
}
