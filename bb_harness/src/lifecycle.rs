//! Run lifecycle: Created → Running → ProducersJoined → ConsumersJoined → Closed.
//!
//! The sequence is the same whether a run finishes on its own, is stopped
//! by the watchdog or is interrupted: every path joins both worker classes
//! and closes the output log once.

use crate::error::HarnessError;
use std::fmt;

/// Lifecycle state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Buffer and streams exist; no thread started.
    Created,
    /// Workers and watchdog started.
    Running,
    /// All producers joined, `PRODUCERS_DONE` set.
    ProducersJoined,
    /// All consumers joined, `CONSUMERS_DONE` set.
    ConsumersJoined,
    /// Output log closed. Terminal.
    Closed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Event that can trigger a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// Threads spawned.
    Start,
    /// Last producer joined.
    ProducersFinished,
    /// Last consumer joined.
    ConsumersFinished,
    /// Output log flushed and closed.
    LogClosed,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Ok(RunState),
    Rejected(&'static str),
}

/// Run lifecycle state machine.
#[derive(Debug, Clone)]
pub struct RunLifecycle {
    state: RunState,
}

impl RunLifecycle {
    pub const fn new() -> Self {
        Self {
            state: RunState::Created,
        }
    }

    #[inline]
    pub const fn state(&self) -> RunState {
        self.state
    }

    pub const fn is_closed(&self) -> bool {
        matches!(self.state, RunState::Closed)
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: RunEvent) -> TransitionResult {
        use RunEvent::*;
        use RunState::*;

        let next = match (self.state, event) {
            (Created, Start) => Running,
            (Running, ProducersFinished) => ProducersJoined,
            (ProducersJoined, ConsumersFinished) => ConsumersJoined,
            (ConsumersJoined, LogClosed) => Closed,
            _ => return TransitionResult::Rejected(invalid_transition_reason(self.state)),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    /// [`handle_event`](Self::handle_event), with rejection as an error.
    pub fn advance(&mut self, event: RunEvent) -> Result<RunState, HarnessError> {
        match self.handle_event(event) {
            TransitionResult::Ok(state) => Ok(state),
            TransitionResult::Rejected(reason) => Err(HarnessError::Lifecycle(format!(
                "{event:?} in state {}: {reason}",
                self.state
            ))),
        }
    }
}

impl Default for RunLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_transition_reason(state: RunState) -> &'static str {
    match state {
        RunState::Created => "Created: only Start allowed",
        RunState::Running => "Running: producers must be joined first",
        RunState::ProducersJoined => "ProducersJoined: consumers must be joined next",
        RunState::ConsumersJoined => "ConsumersJoined: only LogClosed allowed",
        RunState::Closed => "Closed: run is finished",
    }
}
