// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] defines the [`Executor`] trait the orchestrator invokes,
//!   plus a closure adapter.
//! - [`plan_executor`] is the production executor: it walks a
//!   [`crate::plan::Plan`] and runs each step.
//! - [`step_runner`] runs one step as a shell process via
//!   `tokio::process::Command`, honouring cancellation.

pub mod backend;
pub mod plan_executor;
pub mod step_runner;

pub use backend::{executor_fn, ExecFuture, Executor, FnExecutor};
pub use plan_executor::{PlanExecutor, RunnerConfig};
