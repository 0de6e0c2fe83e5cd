// src/exec/backend.rs

//! Executor abstraction.
//!
//! The orchestrator talks to an [`Executor`] instead of knowing how work is
//! actually performed. Production code uses [`PlanExecutor`], which runs the
//! steps of a planned workflow; tests provide their own implementation that
//! records invocations and returns canned outcomes.
//!
//! [`PlanExecutor`]: crate::exec::PlanExecutor

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::errors::Result;

/// Future returned by [`Executor::execute`].
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A unit of work that can be invoked repeatedly and may fail.
///
/// The orchestrator never runs two invocations at once. Implementations own
/// any retry policy they need; the cancellation token is the same one the
/// orchestrator watches, so long-running work can wind down early.
pub trait Executor: Send + Sync {
    fn execute(&self, cancel: CancellationToken) -> ExecFuture<'_>;
}

/// Adapter turning a closure into an [`Executor`].
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnExecutor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExecutor").finish_non_exhaustive()
    }
}

impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn execute(&self, cancel: CancellationToken) -> ExecFuture<'_> {
        Box::pin((self.f)(cancel))
    }
}

/// Convenience for `FnExecutor::new`.
pub fn executor_fn<F, Fut>(f: F) -> FnExecutor<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnExecutor::new(f)
}
