#![cfg(unix)]

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use runwatch_test_utils::{init_tracing, with_timeout, JobBuilder, WorkflowBuilder};
use tokio_util::sync::CancellationToken;

use runwatch::errors::RunwatchError;
use runwatch::exec::{Executor, PlanExecutor, RunnerConfig};
use runwatch::plan::{Plan, WorkflowPlanner};

type TestResult = Result<(), Box<dyn Error>>;

fn config(workdir: &Path) -> RunnerConfig {
    RunnerConfig {
        event_name: "push".to_string(),
        workdir: workdir.to_path_buf(),
        ..RunnerConfig::default()
    }
}

fn plan_for(workflow: WorkflowBuilder) -> Plan {
    WorkflowPlanner::new(vec![workflow.build()]).plan_event("push")
}

#[test]
fn rejects_missing_workdir_and_event_file() -> TestResult {
    let dir = tempfile::tempdir()?;

    let err = PlanExecutor::new(Plan::default(), config(&dir.path().join("absent")))
        .expect_err("missing workdir");
    assert!(matches!(err, RunwatchError::ArgumentError(_)));

    let err = PlanExecutor::new(
        Plan::default(),
        RunnerConfig {
            event_path: Some(dir.path().join("event.json")),
            ..config(dir.path())
        },
    )
    .expect_err("missing event file");
    assert!(matches!(err, RunwatchError::ArgumentError(_)));
    Ok(())
}

#[tokio::test]
async fn empty_plan_succeeds() -> TestResult {
    let dir = tempfile::tempdir()?;
    let executor = PlanExecutor::new(Plan::default(), config(dir.path()))?;
    executor.execute(CancellationToken::new()).await?;
    Ok(())
}

#[tokio::test]
async fn steps_run_in_workdir_with_layered_env() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("event.json"), "{}")?;

    let wf = WorkflowBuilder::new("ci").on("push").with_job(
        "build",
        JobBuilder::new()
            .env("GREETING", "hello")
            .step(Some("event"), "echo \"$GITHUB_EVENT_NAME\" > event.txt")
            .step(Some("greet"), "echo \"$GREETING\" > greeting.txt")
            .step(None, "test -f \"$GITHUB_EVENT_PATH\" && echo ok > payload.txt"),
    );

    let executor = PlanExecutor::new(
        plan_for(wf),
        RunnerConfig {
            event_path: Some(dir.path().join("event.json")),
            ..config(dir.path())
        },
    )?;
    with_timeout(executor.execute(CancellationToken::new())).await?;

    assert_eq!(std::fs::read_to_string(dir.path().join("event.txt"))?, "push\n");
    assert_eq!(std::fs::read_to_string(dir.path().join("greeting.txt"))?, "hello\n");
    assert_eq!(std::fs::read_to_string(dir.path().join("payload.txt"))?, "ok\n");
    Ok(())
}

#[tokio::test]
async fn later_stages_see_earlier_results() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let wf = WorkflowBuilder::new("ci")
        .on("push")
        .with_job("a", JobBuilder::running("echo built > artifact"))
        .with_job(
            "b",
            JobBuilder::running("test -f artifact && cp artifact copied").needs("a"),
        );

    let executor = PlanExecutor::new(plan_for(wf), config(dir.path()))?;
    with_timeout(executor.execute(CancellationToken::new())).await?;

    assert!(dir.path().join("copied").is_file());
    Ok(())
}

#[tokio::test]
async fn failing_step_stops_the_job() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let wf = WorkflowBuilder::new("ci").on("push").with_job(
        "build",
        JobBuilder::new()
            .step(Some("boom"), "exit 3")
            .step(Some("after"), "touch never"),
    );

    let executor = PlanExecutor::new(plan_for(wf), config(dir.path()))?;
    let err = with_timeout(executor.execute(CancellationToken::new()))
        .await
        .expect_err("step fails");

    match err {
        RunwatchError::StepFailed { job, step, code } => {
            assert_eq!(job, "build");
            assert_eq!(step, "boom");
            assert_eq!(code, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("never").exists());
    Ok(())
}

#[tokio::test]
async fn dry_run_skips_steps() -> TestResult {
    let dir = tempfile::tempdir()?;
    let wf = WorkflowBuilder::new("ci")
        .on("push")
        .with_job("build", JobBuilder::running("touch marker"));

    let executor = PlanExecutor::new(
        plan_for(wf),
        RunnerConfig {
            dry_run: true,
            ..config(dir.path())
        },
    )?;
    executor.execute(CancellationToken::new()).await?;

    assert!(!dir.path().join("marker").exists());
    Ok(())
}

#[tokio::test]
async fn cancellation_kills_running_step() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let wf = WorkflowBuilder::new("ci")
        .on("push")
        .with_job("slow", JobBuilder::running("sleep 30"));

    let executor = PlanExecutor::new(plan_for(wf), config(dir.path()))?;
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    let err = with_timeout(executor.execute(cancel))
        .await
        .expect_err("cancelled");
    assert!(matches!(err, RunwatchError::Cancelled));
    Ok(())
}

#[tokio::test]
async fn already_cancelled_token_runs_nothing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let wf = WorkflowBuilder::new("ci")
        .on("push")
        .with_job("build", JobBuilder::running("touch marker"));

    let executor = PlanExecutor::new(plan_for(wf), config(dir.path()))?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = executor.execute(cancel).await.expect_err("cancelled");
    assert!(matches!(err, RunwatchError::Cancelled));
    assert!(!dir.path().join("marker").exists());
    Ok(())
}
