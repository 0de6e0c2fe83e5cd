// src/watch/batch.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What happened to a path between two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// A single detected change. `path` is relative to the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: SystemTime,
}

/// Non-empty, path-ordered group of changes observed in one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEventBatch {
    events: Vec<ChangeEvent>,
}

impl ChangeEventBatch {
    /// Build a batch; returns `None` when there is nothing to report.
    pub fn new(mut events: Vec<ChangeEvent>) -> Option<Self> {
        if events.is_empty() {
            return None;
        }
        events.sort_by(|a, b| a.path.cmp(&b.path));
        Some(Self { events })
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.events.iter().map(|e| e.path.as_path())
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.paths().any(|p| p == path)
    }
}

impl IntoIterator for ChangeEventBatch {
    type Item = ChangeEvent;
    type IntoIter = std::vec::IntoIter<ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl fmt::Display for ChangeEventBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} change(s):", self.events.len())?;
        for event in &self.events {
            write!(f, " {} {};", event.kind, event.path.display())?;
        }
        Ok(())
    }
}
