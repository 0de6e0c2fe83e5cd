// src/engine/mod.rs

//! Orchestration engine.
//!
//! Runs an [`Executor`](crate::exec::Executor) once, or once and then again
//! for every batch of filesystem changes until cancelled or until the
//! executor fails.
//!
//! The pure state machine lives in [`core`] (transitions in
//! [`event_handlers`]); the async shell that owns the watcher, invokes the
//! executor and races cancellation is [`runtime`].

/// Whether a session re-runs on filesystem changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Invoke the executor exactly once.
    Once,
    /// Invoke once, then again for every change batch.
    Watch,
}

/// Lifecycle of one orchestrator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    /// An executor invocation is in flight.
    Running,
    /// Waiting for the next change batch (watch mode only).
    Waiting,
    /// Finished without error.
    Stopped,
    /// The executor failed; terminal.
    Failed,
}

impl OrchestratorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrchestratorState::Stopped | OrchestratorState::Failed)
    }
}

/// Events fed into the core by the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session begins.
    Started,
    /// The in-flight invocation returned `Ok`.
    InvocationSucceeded,
    /// The in-flight invocation returned an error.
    InvocationFailed,
    /// A non-empty change batch arrived.
    ChangesDetected { changes: usize },
    /// The cancellation signal fired.
    CancelRequested,
    /// The change batch stream ended (watcher stopped).
    ChangesClosed,
}

/// What the shell should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreCommand {
    /// Invoke the executor and report the outcome.
    Invoke,
    /// Wait for the next change batch or for cancellation.
    AwaitChanges,
    /// The session is over.
    Finish,
}

/// Counters kept by the core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub invocations: usize,
    pub batches: usize,
    pub changes: usize,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use self::core::OrchestratorCore;
pub use event_handlers::CoreStep;
pub use runtime::Orchestrator;
