// src/engine/core.rs

//! Pure orchestrator state machine.
//!
//! The core consumes [`SessionEvent`]s and answers with the next
//! [`CoreCommand`]. It has no channels, no Tokio types and performs no IO,
//! so every transition can be unit tested directly. The async shell in
//! [`crate::engine::runtime`] turns commands into executor invocations and
//! waits on the change stream and the cancellation signal.

use crate::engine::event_handlers::{
    handle_changes, handle_end_of_watch, handle_failure, handle_start, handle_success, CoreStep,
};
use crate::engine::{OrchestratorState, RunMode, SessionEvent, SessionStats};

#[derive(Debug, Clone)]
pub struct OrchestratorCore {
    mode: RunMode,
    state: OrchestratorState,
    stats: SessionStats,
}

impl OrchestratorCore {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            state: OrchestratorState::Idle,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Apply one event. Terminal states ignore everything.
    pub fn step(&mut self, event: SessionEvent) -> CoreStep {
        if self.state.is_terminal() {
            return CoreStep::ignored(self.state);
        }

        let step = match event {
            SessionEvent::Started => handle_start(self.state, &mut self.stats),
            SessionEvent::InvocationSucceeded => handle_success(self.state, self.mode),
            SessionEvent::InvocationFailed => handle_failure(self.state),
            SessionEvent::ChangesDetected { changes } => {
                handle_changes(self.state, changes, &mut self.stats)
            }
            SessionEvent::CancelRequested | SessionEvent::ChangesClosed => {
                handle_end_of_watch(self.state)
            }
        };

        self.state = step.state;
        step
    }
}
