use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use runwatch_test_utils::{init_tracing, with_timeout, CountingExecutor, FAST_POLL};
use tokio_util::sync::CancellationToken;

use runwatch::engine::Orchestrator;
use runwatch::errors::RunwatchError;
use runwatch::fs::mock::MockFileSystem;
use runwatch::watch::{ChangeWatcher, WatchOptions};

type TestResult = Result<(), Box<dyn Error>>;

fn repo() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/repo/.gitignore", "vendor/\n*.tmp\n");
    fs.add_file("/repo/cmd/run.go", "package main");
    fs.add_file("/repo/src/main.go", "package main");
    fs.add_file("/repo/vendor/pkg/file.go", "package pkg");
    fs
}

fn fast_watcher(fs: &MockFileSystem) -> ChangeWatcher {
    ChangeWatcher::new(
        Arc::new(fs.clone()),
        "/repo",
        WatchOptions {
            poll_interval: FAST_POLL,
            recursive: true,
        },
    )
}

/// Give the poller several intervals to notice (or not notice) a change.
async fn settle() {
    tokio::time::sleep(FAST_POLL * 6).await;
}

#[tokio::test]
async fn single_shot_success_invokes_exactly_once() -> TestResult {
    init_tracing();

    let exec = CountingExecutor::new();
    let orchestrator = Orchestrator::new(exec.clone());

    with_timeout(orchestrator.run_once(CancellationToken::new())).await?;

    assert_eq!(exec.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn single_shot_failure_returns_executor_error() -> TestResult {
    init_tracing();

    let exec = CountingExecutor::failing_on(1);
    let orchestrator = Orchestrator::new(exec.clone());

    let err = with_timeout(orchestrator.run_once(CancellationToken::new()))
        .await
        .expect_err("executor failure must surface");

    assert_eq!(err.to_string(), CountingExecutor::failure(1).to_string());
    assert!(matches!(err, RunwatchError::StepFailed { code: 1, .. }));
    assert_eq!(exec.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn single_shot_ignores_prior_cancellation() -> TestResult {
    init_tracing();

    let exec = CountingExecutor::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    Orchestrator::new(exec.clone()).run_once(cancel).await?;

    assert_eq!(exec.calls(), 1);
    assert_eq!(exec.cancelled_seen(), 1);
    Ok(())
}

#[tokio::test]
async fn watch_failure_on_first_run_stops_session() -> TestResult {
    init_tracing();

    let fs = repo();
    let watcher = fast_watcher(&fs);
    let session = watcher.session_state();
    let exec = CountingExecutor::failing_on(1);

    let err = with_timeout(
        Orchestrator::new(exec.clone()).run_watching(watcher, CancellationToken::new()),
    )
    .await
    .expect_err("first invocation fails");

    assert!(matches!(err, RunwatchError::StepFailed { .. }));
    assert_eq!(exec.calls(), 1);
    assert!(session.is_stopped());
    Ok(())
}

#[tokio::test]
async fn watch_failure_after_change_is_returned() -> TestResult {
    init_tracing();

    let fs = repo();
    let watcher = fast_watcher(&fs);
    let session = watcher.session_state();
    let exec = CountingExecutor::failing_on(2);

    let orchestrator = Orchestrator::new(exec.clone());
    let handle = tokio::spawn(async move {
        orchestrator
            .run_watching(watcher, CancellationToken::new())
            .await
    });

    with_timeout(exec.wait_for_calls(1)).await;
    fs.touch("/repo/src/main.go")?;

    let err = with_timeout(handle)
        .await?
        .expect_err("second invocation fails");

    assert_eq!(err.to_string(), CountingExecutor::failure(2).to_string());
    assert_eq!(exec.calls(), 2);
    assert!(session.is_stopped());
    Ok(())
}

#[tokio::test]
async fn cancel_while_waiting_returns_promptly() -> TestResult {
    init_tracing();

    let fs = repo();
    // Default 2s interval: cancellation must not wait for the next poll.
    let watcher = ChangeWatcher::new(Arc::new(fs.clone()), "/repo", WatchOptions::default());
    let session = watcher.session_state();
    let exec = CountingExecutor::new();
    let cancel = CancellationToken::new();

    let orchestrator = Orchestrator::new(exec.clone());
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run_watching(watcher, cancel).await })
    };

    with_timeout(exec.wait_for_calls(1)).await;
    assert!(session.is_running());

    cancel.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(2), handle).await??;

    assert!(outcome.is_ok());
    assert_eq!(exec.calls(), 1);
    assert!(session.is_stopped());
    Ok(())
}

#[tokio::test]
async fn two_batches_give_three_serialized_invocations() -> TestResult {
    init_tracing();

    let fs = repo();
    let watcher = fast_watcher(&fs);
    let exec = CountingExecutor::new().with_delay(FAST_POLL * 3);
    let cancel = CancellationToken::new();

    let orchestrator = Orchestrator::new(exec.clone());
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run_watching(watcher, cancel).await })
    };

    with_timeout(exec.wait_for_calls(1)).await;
    fs.touch("/repo/src/main.go")?;
    with_timeout(exec.wait_for_calls(2)).await;

    // Lands while the second run is still sleeping; must queue, not overlap.
    fs.touch("/repo/cmd/run.go")?;
    with_timeout(exec.wait_for_calls(3)).await;
    settle().await;

    cancel.cancel();
    with_timeout(handle).await??;

    assert_eq!(exec.calls(), 3);
    assert_eq!(exec.max_concurrency(), 1);
    Ok(())
}

#[tokio::test]
async fn cancel_during_run_waits_for_it_to_finish() -> TestResult {
    init_tracing();

    let fs = repo();
    let watcher = fast_watcher(&fs);
    let session = watcher.session_state();
    let exec = CountingExecutor::new().with_delay(Duration::from_millis(200));
    let cancel = CancellationToken::new();

    let orchestrator = Orchestrator::new(exec.clone());
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run_watching(watcher, cancel).await })
    };

    with_timeout(exec.wait_for_calls(1)).await;
    cancel.cancel();
    with_timeout(handle).await??;

    // The in-flight run completed and saw the cancelled token.
    assert_eq!(exec.calls(), 1);
    assert_eq!(exec.cancelled_seen(), 1);
    assert!(session.is_stopped());
    Ok(())
}

#[tokio::test]
async fn cancellation_wins_over_a_buffered_batch() -> TestResult {
    init_tracing();

    let fs = repo();
    let watcher = fast_watcher(&fs);
    let session = watcher.session_state();
    let exec = CountingExecutor::new().with_delay(Duration::from_millis(300));
    let cancel = CancellationToken::new();

    let orchestrator = Orchestrator::new(exec.clone());
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run_watching(watcher, cancel).await })
    };

    with_timeout(exec.wait_for_calls(1)).await;

    // Several polls pass while the first run is busy, so the batch is queued.
    fs.touch("/repo/src/main.go")?;
    tokio::time::sleep(FAST_POLL * 5).await;
    assert_eq!(exec.calls(), 1);

    cancel.cancel();
    with_timeout(handle).await??;

    assert_eq!(exec.calls(), 1);
    assert_eq!(exec.cancelled_seen(), 1);
    assert!(session.is_stopped());
    Ok(())
}

#[tokio::test]
async fn ignored_changes_do_not_trigger_runs() -> TestResult {
    init_tracing();

    let fs = repo();
    let watcher = fast_watcher(&fs);
    let session = watcher.session_state();
    let exec = CountingExecutor::new();
    let cancel = CancellationToken::new();

    let orchestrator = Orchestrator::new(exec.clone());
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run_watching(watcher, cancel).await })
    };

    with_timeout(exec.wait_for_calls(1)).await;

    fs.touch("/repo/vendor/pkg/file.go")?;
    fs.add_file("/repo/vendor/pkg/extra.go", "package pkg");
    fs.add_file("/repo/scratch.tmp", "junk");
    settle().await;
    assert_eq!(exec.calls(), 1);

    fs.touch("/repo/cmd/run.go")?;
    with_timeout(exec.wait_for_calls(2)).await;

    cancel.cancel();
    with_timeout(handle).await??;

    assert_eq!(exec.calls(), 2);
    assert!(!session.is_running());
    Ok(())
}

#[tokio::test]
async fn closure_executor_sees_the_session_token() -> TestResult {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use runwatch::exec::executor_fn;

    let seen_cancelled = Arc::new(AtomicUsize::new(0));
    let executor = {
        let seen_cancelled = Arc::clone(&seen_cancelled);
        executor_fn(move |cancel: CancellationToken| {
            let seen_cancelled = Arc::clone(&seen_cancelled);
            async move {
                if cancel.is_cancelled() {
                    seen_cancelled.fetch_add(1, Ordering::SeqCst);
                }
                Ok::<(), RunwatchError>(())
            }
        })
    };

    let cancel = CancellationToken::new();
    cancel.cancel();
    Orchestrator::new(executor).run_once(cancel).await?;

    assert_eq!(seen_cancelled.load(Ordering::SeqCst), 1);
    Ok(())
}
