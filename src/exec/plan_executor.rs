// src/exec/plan_executor.rs

//! Executor that runs the jobs of a [`Plan`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use crate::errors::{Result, RunwatchError};
use crate::exec::backend::{ExecFuture, Executor};
use crate::exec::step_runner::{run_step, StepInvocation};
use crate::plan::{Plan, PlannedJob};

/// Settings shared by every invocation of a [`PlanExecutor`].
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub event_name: String,
    pub event_path: Option<PathBuf>,
    pub workdir: PathBuf,
    /// Recorded for container-backed runners; local steps ignore it.
    pub reuse_containers: bool,
    /// Recorded for container-backed runners; local steps ignore it.
    pub force_pull: bool,
    pub log_output: bool,
    pub dry_run: bool,
}

/// Runs a plan stage by stage; jobs within a stage run one after another.
#[derive(Debug, Clone)]
pub struct PlanExecutor {
    plan: Arc<Plan>,
    config: Arc<RunnerConfig>,
}

impl PlanExecutor {
    /// Check the runner settings and build the executor.
    ///
    /// The working directory must exist, and so must the event file if one
    /// was given.
    pub fn new(plan: Plan, config: RunnerConfig) -> Result<Self> {
        if !config.workdir.is_dir() {
            return Err(RunwatchError::ArgumentError(format!(
                "working directory {:?} does not exist",
                config.workdir
            )));
        }
        if let Some(event_path) = &config.event_path {
            if !event_path.is_file() {
                return Err(RunwatchError::ArgumentError(format!(
                    "event file {:?} does not exist",
                    event_path
                )));
            }
        }

        debug!(
            event = %config.event_name,
            reuse_containers = config.reuse_containers,
            force_pull = config.force_pull,
            dry_run = config.dry_run,
            "plan executor configured"
        );

        Ok(Self {
            plan: Arc::new(plan),
            config: Arc::new(config),
        })
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    async fn run_plan(&self, cancel: CancellationToken) -> Result<()> {
        if self.plan.is_empty() {
            info!(event = %self.config.event_name, "nothing to run for this event");
            return Ok(());
        }

        for (idx, stage) in self.plan.stages.iter().enumerate() {
            debug!(stage = idx, jobs = stage.jobs.len(), "starting stage");
            for job in &stage.jobs {
                if cancel.is_cancelled() {
                    return Err(RunwatchError::Cancelled);
                }
                let span = info_span!("job", workflow = %job.workflow, job = %job.id);
                self.run_job(job, &cancel).instrument(span).await?;
            }
        }

        info!(jobs = self.plan.job_count(), "plan finished");
        Ok(())
    }

    async fn run_job(&self, job: &PlannedJob, cancel: &CancellationToken) -> Result<()> {
        for step in &job.config.steps {
            let mut env = self.base_env();
            env.extend(job.config.env.clone());
            env.extend(step.env.clone());

            if self.config.dry_run {
                info!(step = step.display_name(), run = %step.run, "dry-run: skipping step");
                continue;
            }

            run_step(
                StepInvocation {
                    job: &job.id,
                    step: step.display_name(),
                    run: &step.run,
                    workdir: &self.config.workdir,
                    env,
                    log_output: self.config.log_output,
                },
                cancel,
            )
            .await?;
        }
        Ok(())
    }

    /// Variables every step sees, before job and step `env` are layered on.
    fn base_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("GITHUB_EVENT_NAME".to_string(), self.config.event_name.clone());
        env.insert(
            "GITHUB_WORKSPACE".to_string(),
            self.config.workdir.display().to_string(),
        );
        if let Some(event_path) = &self.config.event_path {
            env.insert(
                "GITHUB_EVENT_PATH".to_string(),
                event_path.display().to_string(),
            );
        }
        env
    }
}

impl Executor for PlanExecutor {
    fn execute(&self, cancel: CancellationToken) -> ExecFuture<'_> {
        Box::pin(self.run_plan(cancel))
    }
}
