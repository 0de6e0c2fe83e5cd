// src/plan/mod.rs

//! Execution plans.
//!
//! A [`Plan`] is an ordered list of [`Stage`]s. Every job in a stage only
//! needs jobs from earlier stages. [`planner`] builds plans from the loaded
//! workflows; the plan executor in [`crate::exec`] walks them.

pub mod planner;

use std::fmt;

use crate::config::JobConfig;

pub use planner::WorkflowPlanner;

/// A job selected for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJob {
    pub workflow: String,
    pub id: String,
    pub config: JobConfig,
}

/// Jobs that can start once every earlier stage has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub jobs: Vec<PlannedJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub stages: Vec<Stage>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(|s| s.jobs.is_empty())
    }

    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }

    /// Merge another plan stage by stage.
    pub fn merge(&mut self, other: Plan) {
        for (idx, stage) in other.stages.into_iter().enumerate() {
            if idx >= self.stages.len() {
                self.stages.push(Stage::default());
            }
            self.stages[idx].jobs.extend(stage.jobs);
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "(no jobs)");
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            writeln!(f, "stage {idx}:")?;
            for job in &stage.jobs {
                write!(f, "  - {}/{}", job.workflow, job.id)?;
                if !job.config.needs.is_empty() {
                    write!(f, " (needs: {})", job.config.needs.join(", "))?;
                }
                writeln!(f)?;
                for step in &job.config.steps {
                    writeln!(f, "      step: {}", step.display_name())?;
                }
            }
        }
        Ok(())
    }
}
