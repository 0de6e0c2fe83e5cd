// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Planning error: {0}")]
    PlanError(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Cycle detected in job graph: {0}")]
    DagCycle(String),

    #[error("Invalid argument: {0}")]
    ArgumentError(String),

    #[error("Step '{step}' of job '{job}' failed with exit code {code}")]
    StepFailed { job: String, step: String, code: i32 },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Session task failed: {0}")]
    SessionTask(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RunwatchError>;
