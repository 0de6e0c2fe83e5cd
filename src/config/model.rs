// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// A workflow file as read from the workflows directory.
///
/// ```toml
/// name = "ci"
/// on = ["push", "pull_request"]
///
/// [jobs.build]
/// steps = [{ name = "compile", run = "cargo build" }]
///
/// [jobs.test]
/// needs = ["build"]
/// env = { RUST_BACKTRACE = "1" }
/// steps = [{ run = "cargo test" }]
/// ```
///
/// This is the unvalidated form; convert it with `Workflow::try_from`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawWorkflowFile {
    /// Display name; the loader falls back to the file stem.
    #[serde(default)]
    pub name: Option<String>,

    /// Events that trigger this workflow (e.g. `"push"`).
    #[serde(default)]
    pub on: Vec<String>,

    /// Jobs keyed by id.
    #[serde(default)]
    pub jobs: BTreeMap<String, JobConfig>,
}

/// `[jobs.<id>]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct JobConfig {
    /// Jobs (in the same workflow) that must finish before this one starts.
    #[serde(default)]
    pub needs: Vec<String>,

    /// Environment shared by every step of the job.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Steps, run in order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// One entry of `steps = [...]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StepConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Shell command for the step.
    pub run: String,

    /// Step-level environment, layered over the job's.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl StepConfig {
    /// Name used in logs and errors: the explicit name, or the command itself.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.run)
    }
}

/// A validated workflow.
///
/// Only constructed through `TryFrom<RawWorkflowFile>`, so `needs` always
/// refer to existing jobs and the job graph is acyclic.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub name: String,
    pub on: Vec<String>,
    pub jobs: BTreeMap<String, JobConfig>,
}

impl Workflow {
    pub(crate) fn new_unchecked(
        name: String,
        on: Vec<String>,
        jobs: BTreeMap<String, JobConfig>,
    ) -> Self {
        Self { name, on, jobs }
    }

    pub fn triggered_by(&self, event: &str) -> bool {
        self.on.iter().any(|e| e == event)
    }
}
