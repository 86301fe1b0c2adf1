//! Per-run watchdog.
//!
//! Runs on its own thread next to the workers. It forces termination when
//! the timeout passes with a worker class still active, or as soon as an
//! operator interrupt is seen. Forcing termination means setting `KILL` and
//! writing the sentinel record; the orchestrator still joins every worker.

use bb_buffer::{BoundedBuffer, LockSet};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// How often the interrupt flag is checked while waiting for the deadline.
pub const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Why a run was forcibly terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KillReason {
    /// Workers still active when the timeout elapsed.
    Timeout,
    /// Operator interrupt (Ctrl-C).
    Interrupt,
    /// A worker thread could not be started.
    Aborted,
}

impl fmt::Display for KillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillReason::Timeout => f.write_str("timeout"),
            KillReason::Interrupt => f.write_str("interrupt"),
            KillReason::Aborted => f.write_str("aborted"),
        }
    }
}

/// Watchdog for a single run.
#[derive(Debug, Default)]
pub struct Watchdog {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tell [`watch`](Self::watch) to return without killing.
    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Wait for the deadline, an interrupt or [`stop`](Self::stop).
    ///
    /// An interrupt is consumed (the flag is cleared) by the run it stops.
    /// Returns the reason if this call killed the run.
    pub fn watch(
        &self,
        timeout: Duration,
        interrupt: &AtomicBool,
        buffer: &BoundedBuffer,
        locks: &LockSet,
    ) -> Option<KillReason> {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();

        loop {
            if *stopped {
                return None;
            }
            if interrupt.swap(false, Ordering::SeqCst) {
                drop(stopped);
                warn!("Interrupt received; setting KILL and draining workers");
                kill_run(buffer, locks);
                return Some(KillReason::Interrupt);
            }

            let now = Instant::now();
            if now >= deadline {
                if !buffer.flags().workers_active() {
                    return None;
                }
                drop(stopped);
                warn!(
                    "Timer expired after {:.2}s; setting KILL to stop workers and marking run as killed",
                    timeout.as_secs_f64()
                );
                kill_run(buffer, locks);
                return Some(KillReason::Timeout);
            }

            let wake_at = deadline.min(now + INTERRUPT_POLL);
            self.wake.wait_until(&mut stopped, wake_at);
        }
    }
}

/// Set `KILL` and append the sentinel record if it is not there yet.
///
/// A failed sentinel write is reported and otherwise ignored; the run's
/// statistics may then miss the kill.
pub fn kill_run(buffer: &BoundedBuffer, locks: &LockSet) {
    buffer.flags().request_kill();
    if let Err(e) = locks.output.lock().append_sentinel() {
        error!("Failed to write kill record; grade for this run may be inflated: {e}");
    }
}
