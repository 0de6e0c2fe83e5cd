// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::watch::WatchOptions;

/// Command-line arguments for `runwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runwatch",
    version,
    about = "Run workflow jobs locally, once or every time the working tree changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Event to run (e.g. `push`). Defaults to the first event any workflow
    /// is triggered by.
    #[arg(value_name = "EVENT")]
    pub event_name: Option<String>,

    /// Watch the working directory and run again when files change.
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// Print the plan instead of running it.
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Run only this job (plus the jobs it needs).
    #[arg(short = 'j', long, value_name = "JOB")]
    pub job: Option<String>,

    /// Path to a workflow file or a directory of workflow files.
    #[arg(
        short = 'W',
        long,
        value_name = "PATH",
        default_value = "./.github/workflows/"
    )]
    pub workflows: PathBuf,

    /// Working directory; also the root that is watched.
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Path to the event payload file exposed to steps.
    #[arg(short = 'e', long = "event", value_name = "PATH")]
    pub event_path: Option<PathBuf>,

    /// Reuse containers between runs.
    #[arg(short = 'r', long)]
    pub reuse: bool,

    /// Pull images even if already present.
    #[arg(short = 'p', long)]
    pub pull: bool,

    /// Log output from steps.
    #[arg(short = 'o', long)]
    pub output: bool,

    /// Show what would run without running it.
    #[arg(short = 'n', long)]
    pub dryrun: bool,

    /// Verbose output (same as `--log-level debug`).
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `-v`, then `RUNWATCH_LOG`, then `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Seconds between two polls of the working tree in watch mode.
    #[arg(long, value_name = "SECS", default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Working directory as given on the command line.
    pub fn workdir(&self) -> &Path {
        &self.directory
    }

    /// Workflows path, resolved against the working directory unless absolute.
    pub fn workflows_path(&self) -> PathBuf {
        resolve_against(&self.directory, &self.workflows)
    }

    /// Event payload path, resolved against the working directory unless absolute.
    pub fn event_file(&self) -> Option<PathBuf> {
        self.event_path
            .as_deref()
            .map(|path| resolve_against(&self.directory, path))
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            poll_interval: Duration::from_secs(self.poll_interval),
            ..WatchOptions::default()
        }
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
