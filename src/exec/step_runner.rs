// src/exec/step_runner.rs

//! Individual step process runner.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, RunwatchError};

/// Everything needed to launch one step.
#[derive(Debug, Clone)]
pub struct StepInvocation<'a> {
    pub job: &'a str,
    pub step: &'a str,
    pub run: &'a str,
    pub workdir: &'a Path,
    pub env: BTreeMap<String, String>,
    /// Forward stdout lines at `info` instead of `debug`.
    pub log_output: bool,
}

/// Run a single step through the platform shell.
///
/// - A non-zero exit becomes [`RunwatchError::StepFailed`].
/// - If `cancel` fires first, the child is killed and
///   [`RunwatchError::Cancelled`] is returned.
pub async fn run_step(invocation: StepInvocation<'_>, cancel: &CancellationToken) -> Result<()> {
    let StepInvocation {
        job,
        step,
        run,
        workdir,
        env,
        log_output,
    } = invocation;

    info!(job, step, "starting step");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(run);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(run);
        c
    };

    cmd.current_dir(workdir)
        .envs(&env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for step '{step}' of job '{job}'"))?;

    if let Some(stdout) = child.stdout.take() {
        let job = job.to_string();
        let step = step.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if log_output {
                    info!(job = %job, step = %step, "| {}", line);
                } else {
                    debug!(job = %job, step = %step, "stdout: {}", line);
                }
            }
        });
    }

    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let job = job.to_string();
        let step = step.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(job = %job, step = %step, "stderr: {}", line);
            }
        });
    }

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for step '{step}' of job '{job}'"))?;
            let code = status.code().unwrap_or(-1);

            info!(job, step, exit_code = code, success = status.success(), "step exited");

            if status.success() {
                Ok(())
            } else {
                Err(RunwatchError::StepFailed {
                    job: job.to_string(),
                    step: step.to_string(),
                    code,
                })
            }
        }

        _ = cancel.cancelled() => {
            info!(job, step, "cancellation requested; killing step process");
            if let Err(e) = child.kill().await {
                warn!(job, step, error = %e, "failed to kill step process on cancellation");
            }
            Err(RunwatchError::Cancelled)
        }
    }
}
