// src/engine/event_handlers.rs

//! Transition functions for the orchestrator core.

use crate::engine::{CoreCommand, OrchestratorState, RunMode, SessionStats};

/// Result of feeding one event to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreStep {
    /// State after the event.
    pub state: OrchestratorState,
    /// Next action for the shell; `None` when the event was not valid in the
    /// state it arrived in and was ignored.
    pub command: Option<CoreCommand>,
}

impl CoreStep {
    fn to(state: OrchestratorState, command: CoreCommand) -> Self {
        Self {
            state,
            command: Some(command),
        }
    }

    pub(crate) fn ignored(state: OrchestratorState) -> Self {
        Self {
            state,
            command: None,
        }
    }
}

/// `Started`: the first invocation happens regardless of mode.
pub fn handle_start(state: OrchestratorState, stats: &mut SessionStats) -> CoreStep {
    match state {
        OrchestratorState::Idle => invoke(stats),
        other => CoreStep::ignored(other),
    }
}

/// `InvocationSucceeded`: single-shot sessions end; watch sessions wait.
pub fn handle_success(state: OrchestratorState, mode: RunMode) -> CoreStep {
    match (state, mode) {
        (OrchestratorState::Running, RunMode::Once) => {
            CoreStep::to(OrchestratorState::Stopped, CoreCommand::Finish)
        }
        (OrchestratorState::Running, RunMode::Watch) => {
            CoreStep::to(OrchestratorState::Waiting, CoreCommand::AwaitChanges)
        }
        (other, _) => CoreStep::ignored(other),
    }
}

/// `InvocationFailed`: terminal, no retry.
pub fn handle_failure(state: OrchestratorState) -> CoreStep {
    match state {
        OrchestratorState::Running => CoreStep::to(OrchestratorState::Failed, CoreCommand::Finish),
        other => CoreStep::ignored(other),
    }
}

/// `ChangesDetected`: re-invoke, but only from `Waiting`.
pub fn handle_changes(
    state: OrchestratorState,
    changes: usize,
    stats: &mut SessionStats,
) -> CoreStep {
    match state {
        OrchestratorState::Waiting => {
            stats.batches += 1;
            stats.changes += changes;
            invoke(stats)
        }
        other => CoreStep::ignored(other),
    }
}

/// `CancelRequested` / `ChangesClosed`: a waiting session stops cleanly.
///
/// Cancellation is cooperative; a running invocation is never interrupted
/// by the core, so these are only valid while waiting.
pub fn handle_end_of_watch(state: OrchestratorState) -> CoreStep {
    match state {
        OrchestratorState::Waiting => CoreStep::to(OrchestratorState::Stopped, CoreCommand::Finish),
        other => CoreStep::ignored(other),
    }
}

fn invoke(stats: &mut SessionStats) -> CoreStep {
    stats.invocations += 1;
    CoreStep::to(OrchestratorState::Running, CoreCommand::Invoke)
}
