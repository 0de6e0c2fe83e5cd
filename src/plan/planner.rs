// src/plan/planner.rs

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::debug;

use crate::config::{load_workflows, Workflow};
use crate::errors::{Result, RunwatchError};
use crate::fs::FileSystem;
use crate::plan::{Plan, PlannedJob, Stage};

/// Builds plans from a set of validated workflows.
#[derive(Debug, Clone, Default)]
pub struct WorkflowPlanner {
    workflows: Vec<Workflow>,
}

impl WorkflowPlanner {
    pub fn new(workflows: Vec<Workflow>) -> Self {
        Self { workflows }
    }

    /// Load every workflow under `path` (a file or a directory).
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let workflows = load_workflows(fs, path)?;
        debug!(count = workflows.len(), ?path, "loaded workflows");
        Ok(Self::new(workflows))
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    /// Distinct trigger events, in the order they are first declared.
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = Vec::new();
        for event in self.workflows.iter().flat_map(|wf| wf.on.iter()) {
            if !events.contains(event) {
                events.push(event.clone());
            }
        }
        events
    }

    /// Every job of every workflow triggered by `event`.
    ///
    /// An event nothing listens to yields an empty plan.
    pub fn plan_event(&self, event: &str) -> Plan {
        let mut plan = Plan::default();
        for wf in self.workflows.iter().filter(|wf| wf.triggered_by(event)) {
            let ids: BTreeSet<&str> = wf.jobs.keys().map(String::as_str).collect();
            plan.merge(plan_workflow(wf, &ids));
        }
        plan
    }

    /// `job` plus everything it transitively needs, in every workflow that
    /// defines it.
    pub fn plan_job(&self, job: &str) -> Result<Plan> {
        let mut plan = Plan::default();
        let mut found = false;
        for wf in self.workflows.iter().filter(|wf| wf.jobs.contains_key(job)) {
            found = true;
            plan.merge(plan_workflow(wf, &needs_closure(wf, job)));
        }
        if !found {
            return Err(RunwatchError::JobNotFound(job.to_string()));
        }
        Ok(plan)
    }
}

/// `job` and all of its transitive `needs` within `wf`.
fn needs_closure<'a>(wf: &'a Workflow, job: &'a str) -> BTreeSet<&'a str> {
    let mut selected = BTreeSet::new();
    let mut stack = vec![job];
    while let Some(id) = stack.pop() {
        if !selected.insert(id) {
            continue;
        }
        if let Some(cfg) = wf.jobs.get(id) {
            stack.extend(cfg.needs.iter().map(String::as_str));
        }
    }
    selected
}

/// Layer the selected jobs of one workflow into stages.
///
/// A job's stage is one past the deepest stage among its `needs`. The
/// workflow is validated acyclic, so the recursion terminates.
fn plan_workflow(wf: &Workflow, ids: &BTreeSet<&str>) -> Plan {
    let mut depths: HashMap<&str, usize> = HashMap::new();
    for id in ids {
        depth_of(wf, id, &mut depths);
    }

    let mut plan = Plan::default();
    for id in ids {
        let depth = depths.get(id).copied().unwrap_or(0);
        while plan.stages.len() <= depth {
            plan.stages.push(Stage::default());
        }
        if let Some(config) = wf.jobs.get(*id) {
            plan.stages[depth].jobs.push(PlannedJob {
                workflow: wf.name.clone(),
                id: (*id).to_string(),
                config: config.clone(),
            });
        }
    }
    plan
}

fn depth_of<'a>(wf: &'a Workflow, id: &'a str, depths: &mut HashMap<&'a str, usize>) -> usize {
    if let Some(depth) = depths.get(id) {
        return *depth;
    }
    let depth = wf
        .jobs
        .get(id)
        .map(|job| {
            job.needs
                .iter()
                .map(|dep| depth_of(wf, dep, depths) + 1)
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    depths.insert(id, depth);
    depth
}
