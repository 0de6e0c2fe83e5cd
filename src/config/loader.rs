// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawWorkflowFile, Workflow};
use crate::errors::{Result, RunwatchError};
use crate::fs::FileSystem;

/// Extension of workflow files in the workflows directory.
pub const WORKFLOW_EXTENSION: &str = "toml";

/// Parse a single workflow file without semantic validation.
///
/// A missing `name` is filled in from the file stem.
pub fn load_from_path(fs: &dyn FileSystem, path: &Path) -> Result<RawWorkflowFile> {
    let contents = fs.read_to_string(path)?;

    let mut raw: RawWorkflowFile = toml::from_str(&contents).map_err(|err| {
        RunwatchError::ConfigError(format!("{}: {err}", path.display()))
    })?;

    if raw.name.is_none() {
        raw.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }

    Ok(raw)
}

/// Load and validate one workflow file.
pub fn load_and_validate(fs: &dyn FileSystem, path: &Path) -> Result<Workflow> {
    let raw = load_from_path(fs, path)?;
    Workflow::try_from(raw)
}

/// Load every workflow under `path`.
///
/// `path` may name a single workflow file or a directory; in a directory
/// every `*.toml` file is loaded, in file-name order. Subdirectories are not
/// searched.
pub fn load_workflows(fs: &dyn FileSystem, path: &Path) -> Result<Vec<Workflow>> {
    if fs.is_file(path) {
        return Ok(vec![load_and_validate(fs, path)?]);
    }
    if !fs.is_dir(path) {
        return Err(RunwatchError::PlanError(format!(
            "workflows path {:?} does not exist",
            path
        )));
    }

    let mut files: Vec<PathBuf> = fs
        .read_dir(path)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .filter(|p| p.extension().is_some_and(|ext| ext == WORKFLOW_EXTENSION))
        .collect();
    files.sort();

    let mut workflows = Vec::with_capacity(files.len());
    for file in files {
        debug!(?file, "loading workflow");
        workflows.push(load_and_validate(fs, &file)?);
    }
    Ok(workflows)
}
