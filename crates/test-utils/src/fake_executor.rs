use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use runwatch::errors::RunwatchError;
use runwatch::exec::{ExecFuture, Executor};

/// A fake executor that:
/// - counts invocations and tracks how many overlap
/// - optionally sleeps inside each invocation
/// - fails on a chosen invocation with a `StepFailed` error
///
/// Clones share their counters, so a test can keep one handle while the
/// orchestrator owns another.
#[derive(Clone)]
pub struct CountingExecutor {
    inner: Arc<Inner>,
}

struct Inner {
    delay: Duration,
    fail_on: Option<usize>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    cancelled_seen: AtomicUsize,
    calls: watch::Sender<usize>,
}

impl CountingExecutor {
    pub fn new() -> Self {
        Self::build(Duration::ZERO, None)
    }

    /// Fail the `n`th invocation (1-based).
    pub fn failing_on(n: usize) -> Self {
        Self::build(Duration::ZERO, Some(n))
    }

    /// Sleep for `delay` inside every invocation.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self::build(delay, self.inner.fail_on)
    }

    fn build(delay: Duration, fail_on: Option<usize>) -> Self {
        let (calls, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                delay,
                fail_on,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                cancelled_seen: AtomicUsize::new(0),
                calls,
            }),
        }
    }

    /// Error returned by the failing invocation `n`.
    pub fn failure(n: usize) -> RunwatchError {
        RunwatchError::StepFailed {
            job: "fake".to_string(),
            step: format!("call-{n}"),
            code: 1,
        }
    }

    pub fn calls(&self) -> usize {
        *self.inner.calls.borrow()
    }

    /// Highest number of invocations ever in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.inner.max_active.load(Ordering::SeqCst)
    }

    /// Invocations that finished with their token already cancelled.
    pub fn cancelled_seen(&self) -> usize {
        self.inner.cancelled_seen.load(Ordering::SeqCst)
    }

    /// Resolve once at least `n` invocations have started.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.inner.calls.subscribe();
        rx.wait_for(|calls| *calls >= n)
            .await
            .expect("call counter dropped");
    }
}

impl Default for CountingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for CountingExecutor {
    fn execute(&self, cancel: CancellationToken) -> ExecFuture<'_> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let active = inner.active.fetch_add(1, Ordering::SeqCst) + 1;
            inner.max_active.fetch_max(active, Ordering::SeqCst);

            let mut call = 0;
            inner.calls.send_modify(|calls| {
                *calls += 1;
                call = *calls;
            });

            if !inner.delay.is_zero() {
                tokio::time::sleep(inner.delay).await;
            }
            if cancel.is_cancelled() {
                inner.cancelled_seen.fetch_add(1, Ordering::SeqCst);
            }

            inner.active.fetch_sub(1, Ordering::SeqCst);

            if inner.fail_on == Some(call) {
                Err(Self::failure(call))
            } else {
                Ok(())
            }
        })
    }
}

impl std::fmt::Debug for CountingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingExecutor")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

