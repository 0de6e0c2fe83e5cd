// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{RawWorkflowFile, Workflow};
use crate::errors::{Result, RunwatchError};

impl TryFrom<RawWorkflowFile> for Workflow {
    type Error = RunwatchError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_workflow(&raw)?;
        let name = raw.name.unwrap_or_default();
        Ok(Workflow::new_unchecked(name, raw.on, raw.jobs))
    }
}

fn validate_raw_workflow(wf: &RawWorkflowFile) -> Result<()> {
    ensure_named(wf)?;
    ensure_has_jobs(wf)?;
    validate_steps(wf)?;
    validate_job_dependencies(wf)?;
    validate_dag(wf)?;
    Ok(())
}

fn label(wf: &RawWorkflowFile) -> &str {
    wf.name.as_deref().unwrap_or("<unnamed>")
}

fn ensure_named(wf: &RawWorkflowFile) -> Result<()> {
    match wf.name.as_deref() {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(RunwatchError::ConfigError(
            "workflow must have a non-empty `name`".to_string(),
        )),
    }
}

fn ensure_has_jobs(wf: &RawWorkflowFile) -> Result<()> {
    if wf.jobs.is_empty() {
        return Err(RunwatchError::ConfigError(format!(
            "workflow '{}' must contain at least one [jobs.<id>] section",
            label(wf)
        )));
    }
    Ok(())
}

fn validate_steps(wf: &RawWorkflowFile) -> Result<()> {
    for (id, job) in wf.jobs.iter() {
        if job.steps.is_empty() {
            return Err(RunwatchError::ConfigError(format!(
                "job '{}' in workflow '{}' has no steps",
                id,
                label(wf)
            )));
        }
        if let Some(idx) = job.steps.iter().position(|s| s.run.trim().is_empty()) {
            return Err(RunwatchError::ConfigError(format!(
                "step {} of job '{}' in workflow '{}' has an empty `run`",
                idx + 1,
                id,
                label(wf)
            )));
        }
    }
    Ok(())
}

fn validate_job_dependencies(wf: &RawWorkflowFile) -> Result<()> {
    for (id, job) in wf.jobs.iter() {
        for dep in job.needs.iter() {
            if dep == id {
                return Err(RunwatchError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `needs`",
                    id
                )));
            }
            if !wf.jobs.contains_key(dep) {
                return Err(RunwatchError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `needs`",
                    id, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(wf: &RawWorkflowFile) -> Result<()> {
    // Edge direction: dep -> job. For `needs = ["A"]` on job B we add A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in wf.jobs.keys() {
        graph.add_node(id.as_str());
    }

    for (id, job) in wf.jobs.iter() {
        for dep in job.needs.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(RunwatchError::DagCycle(format!(
            "cycle detected in workflow '{}' involving job '{}'",
            label(wf),
            cycle.node_id()
        ))),
    }
}
