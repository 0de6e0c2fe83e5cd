// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod plan;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::engine::Orchestrator;
use crate::errors::RunwatchError;
use crate::exec::{PlanExecutor, RunnerConfig};
use crate::fs::{FileSystem, RealFileSystem};
use crate::plan::{Plan, WorkflowPlanner};
use crate::watch::ChangeWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workflow loading and planning
/// - the plan executor
/// - the orchestrator, with a change watcher in `--watch` mode
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let planner = WorkflowPlanner::load(fs.as_ref(), &args.workflows_path())?;
    let event_name = select_event(&args, &planner);
    let plan = build_plan(&args, &planner, &event_name)?;

    if args.list {
        print_plan(&plan);
        return Ok(());
    }

    let config = RunnerConfig {
        event_name,
        event_path: args.event_file(),
        workdir: args.workdir().to_path_buf(),
        reuse_containers: args.reuse,
        force_pull: args.pull,
        log_output: args.output,
        dry_run: args.dryrun,
    };
    let executor = PlanExecutor::new(plan, config)?;

    // Ctrl-C → cancellation.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received; shutting down");
            cancel.cancel();
        });
    }

    let orchestrator = Orchestrator::new(executor);
    if args.watch {
        let watcher = ChangeWatcher::new(fs, args.workdir(), args.watch_options());
        orchestrator.run_watching(watcher, cancel).await?;
    } else {
        orchestrator.run_once(cancel).await?;
    }
    Ok(())
}

/// The positional event, else the first event any workflow declares.
///
/// Empty when there is neither.
pub fn select_event(args: &CliArgs, planner: &WorkflowPlanner) -> String {
    if let Some(event) = &args.event_name {
        return event.clone();
    }
    match planner.events().into_iter().next() {
        Some(event) => {
            debug!(%event, "using detected workflow event");
            event
        }
        None => String::new(),
    }
}

/// Plan a single job when `--job` is set, else every job the event triggers.
pub fn build_plan(
    args: &CliArgs,
    planner: &WorkflowPlanner,
    event_name: &str,
) -> Result<Plan, RunwatchError> {
    match &args.job {
        Some(job) => {
            debug!(%job, "planning job");
            planner.plan_job(job)
        }
        None => {
            debug!(event = %event_name, "planning event");
            Ok(planner.plan_event(event_name))
        }
    }
}

/// `--list` output: stages, jobs and steps.
fn print_plan(plan: &Plan) {
    println!("runwatch plan ({} jobs)", plan.job_count());
    print!("{plan}");
    debug!("list complete (no execution)");
}
