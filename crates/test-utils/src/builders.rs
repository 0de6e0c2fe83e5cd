use std::collections::BTreeMap;
use std::fmt::Write as _;

use runwatch::config::{JobConfig, RawWorkflowFile, StepConfig, Workflow};

/// Builder for workflows, either as validated values or as TOML text for
/// loader tests.
pub struct WorkflowBuilder {
    name: String,
    on: Vec<String>,
    jobs: BTreeMap<String, JobConfig>,
}

impl WorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            on: Vec::new(),
            jobs: BTreeMap::new(),
        }
    }

    pub fn on(mut self, event: &str) -> Self {
        self.on.push(event.to_string());
        self
    }

    pub fn with_job(mut self, id: &str, job: JobBuilder) -> Self {
        self.jobs.insert(id.to_string(), job.build());
        self
    }

    pub fn build_raw(self) -> RawWorkflowFile {
        RawWorkflowFile {
            name: Some(self.name),
            on: self.on,
            jobs: self.jobs,
        }
    }

    pub fn build(self) -> Workflow {
        Workflow::try_from(self.build_raw()).expect("Failed to build valid workflow from builder")
    }

    /// Render as a workflow file.
    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        writeln!(out, "name = {:?}", self.name).unwrap();
        writeln!(out, "on = {:?}", self.on).unwrap();
        for (id, job) in &self.jobs {
            writeln!(out).unwrap();
            writeln!(out, "[jobs.{id}]").unwrap();
            writeln!(out, "needs = {:?}", job.needs).unwrap();
            if !job.env.is_empty() {
                let env: Vec<String> =
                    job.env.iter().map(|(k, v)| format!("{k} = {v:?}")).collect();
                writeln!(out, "env = {{ {} }}", env.join(", ")).unwrap();
            }
            let steps: Vec<String> = job
                .steps
                .iter()
                .map(|s| match &s.name {
                    Some(name) => format!("{{ name = {name:?}, run = {:?} }}", s.run),
                    None => format!("{{ run = {:?} }}", s.run),
                })
                .collect();
            writeln!(out, "steps = [{}]", steps.join(", ")).unwrap();
        }
        out
    }
}

/// Builder for `JobConfig`.
pub struct JobBuilder {
    job: JobConfig,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self {
            job: JobConfig::default(),
        }
    }

    /// Job with a single unnamed step.
    pub fn running(cmd: &str) -> Self {
        Self::new().step(None, cmd)
    }

    pub fn needs(mut self, dep: &str) -> Self {
        self.job.needs.push(dep.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.job.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn step(mut self, name: Option<&str>, run: &str) -> Self {
        self.job.steps.push(StepConfig {
            name: name.map(str::to_string),
            run: run.to_string(),
            env: BTreeMap::new(),
        });
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}
