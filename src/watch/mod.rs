// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Loading gitignore-style exclusion rules from the watched root.
//! - Polling the tree on a fixed interval and diffing snapshots.
//! - Handing non-empty change batches to whoever consumes the session.
//!
//! It does **not** know what a change should trigger; the orchestrator in
//! [`crate::engine`] decides that.

pub mod batch;
pub mod ignore;
pub mod snapshot;
pub mod watcher;

pub use batch::{ChangeEvent, ChangeEventBatch, ChangeKind};
pub use self::ignore::{IgnoreMatcher, IGNORE_FILE_NAME};
pub use watcher::{
    ChangeBatches, ChangeWatcher, SessionPhase, SessionState, WatchOptions,
    DEFAULT_POLL_INTERVAL,
};
