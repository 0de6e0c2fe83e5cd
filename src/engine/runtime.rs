// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument, Span};

use crate::errors::{Result, RunwatchError};
use crate::exec::Executor;
use crate::watch::{ChangeBatches, ChangeWatcher};

use super::core::OrchestratorCore;
use super::{CoreCommand, RunMode, SessionEvent};

/// Drives an [`Executor`] once or repeatedly on filesystem changes.
///
/// This is the async IO shell around [`OrchestratorCore`]: it invokes the
/// executor, reads change batches and races them against cancellation,
/// while the core decides what happens next.
///
/// In watch mode a background task owns the core, consumes batches and
/// invokes the executor one call at a time. It is the only writer of the
/// session outcome and hands it back through its join handle. The calling
/// task only waits for cancellation or for that task to finish, then stops
/// the watcher and joins.
pub struct Orchestrator<E: Executor> {
    executor: Arc<E>,
    span: Span,
}

impl<E: Executor> fmt::Debug for Orchestrator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator").finish_non_exhaustive()
    }
}

impl<E: Executor + 'static> Orchestrator<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
            span: info_span!("orchestrator"),
        }
    }

    /// Log under `span` instead of the default `orchestrator` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Invoke the executor exactly once and return its outcome.
    ///
    /// No watch session is involved. The token is handed to the executor
    /// but does not prevent the invocation.
    pub async fn run_once(&self, cancel: CancellationToken) -> Result<()> {
        drive_session(Arc::clone(&self.executor), RunMode::Once, None, cancel)
            .instrument(self.span.clone())
            .await
    }

    /// Invoke the executor, then again for every change batch the watcher
    /// reports, until `cancel` fires or an invocation fails.
    ///
    /// The watcher is started here and stopped on every exit path. On
    /// cancellation an in-flight invocation is awaited (it sees the same
    /// token) and a batch that has not started running is dropped.
    pub async fn run_watching(
        &self,
        mut watcher: ChangeWatcher,
        cancel: CancellationToken,
    ) -> Result<()> {
        watcher.start().await?;
        let batches = watcher.change_batches()?;

        self.span.in_scope(|| {
            info!(root = %watcher.root().display(), "watching for changes");
        });

        let mut session = tokio::spawn(
            drive_session(
                Arc::clone(&self.executor),
                RunMode::Watch,
                Some(batches),
                cancel.clone(),
            )
            .instrument(self.span.clone()),
        );

        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            joined = &mut session => Some(joined),
        };

        watcher.stop();

        let joined = match finished {
            Some(joined) => joined,
            None => {
                self.span.in_scope(|| {
                    info!("cancellation requested; waiting for the current run to finish")
                });
                session.await
            }
        };

        watcher.wait_stopped().await;

        match joined {
            Ok(outcome) => outcome,
            Err(err) => Err(RunwatchError::SessionTask(err)),
        }
    }
}

/// Feed the core until it says to finish.
///
/// Returns the error of the failed invocation, if any.
async fn drive_session<E: Executor>(
    executor: Arc<E>,
    mode: RunMode,
    mut batches: Option<ChangeBatches>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut core = OrchestratorCore::new(mode);
    let mut failure = None;
    let mut step = core.step(SessionEvent::Started);

    loop {
        let Some(command) = step.command else {
            return Err(RunwatchError::Other(anyhow!(
                "orchestrator reached an invalid transition in state {:?}",
                step.state
            )));
        };

        let event = match command {
            CoreCommand::Invoke => {
                let invocation = core.stats().invocations;
                debug!(invocation, "invoking executor");
                match executor.execute(cancel.clone()).await {
                    Ok(()) => SessionEvent::InvocationSucceeded,
                    Err(err) => {
                        error!(invocation, error = %err, "executor failed");
                        failure = Some(err);
                        SessionEvent::InvocationFailed
                    }
                }
            }
            CoreCommand::AwaitChanges => next_change_event(batches.as_mut(), &cancel).await,
            CoreCommand::Finish => break,
        };

        step = core.step(event);
    }

    let stats = core.stats();
    info!(
        state = ?step.state,
        invocations = stats.invocations,
        batches = stats.batches,
        "session finished"
    );

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Wait for the next batch, preferring cancellation over anything buffered.
async fn next_change_event(
    batches: Option<&mut ChangeBatches>,
    cancel: &CancellationToken,
) -> SessionEvent {
    let Some(batches) = batches else {
        return SessionEvent::ChangesClosed;
    };

    debug!("waiting for changes");

    tokio::select! {
        biased;
        _ = cancel.cancelled() => SessionEvent::CancelRequested,
        next = batches.next() => match next {
            // Cancelled while the batch was being delivered.
            Some(_) if cancel.is_cancelled() => SessionEvent::CancelRequested,
            Some(batch) => {
                info!(changes = batch.len(), "changes detected; running again");
                debug!("{batch}");
                SessionEvent::ChangesDetected { changes: batch.len() }
            }
            None => {
                debug!("change stream closed");
                SessionEvent::ChangesClosed
            }
        },
    }
}
