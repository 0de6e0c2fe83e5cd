// src/config/mod.rs

//! Workflow definitions.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load workflow files from the workflows directory (`loader.rs`).
//! - Validate job graphs: unknown or self `needs`, cycles (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_workflows};
pub use model::{JobConfig, RawWorkflowFile, StepConfig, Workflow};
