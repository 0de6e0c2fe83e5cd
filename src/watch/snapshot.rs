// src/watch/snapshot.rs

//! Tree scanning and snapshot diffing for the polling watcher.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;
use tracing::trace;

use crate::fs::{FileStamp, FileSystem};
use crate::watch::batch::{ChangeEvent, ChangeKind};
use crate::watch::ignore::IgnoreMatcher;

/// Stamp of every non-ignored file under the root, keyed by relative path.
pub type Snapshot = BTreeMap<PathBuf, FileStamp>;

/// Walk `root` and stamp every file the matcher does not exclude.
///
/// Ignored directories are not descended into. Errors on individual entries
/// are not fatal: the entry (and anything beneath it) keeps whatever stamp
/// `previous` had for it, so a transient failure does not show up as a
/// removal followed by a re-creation. Only a failure to list the root itself
/// is returned.
pub fn scan_tree(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &IgnoreMatcher,
    recursive: bool,
    previous: &Snapshot,
) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if dir == root => return Err(err),
            Err(err) => {
                trace!(?dir, error = %err, "listing failed; keeping previous state");
                if let Ok(rel) = dir.strip_prefix(root) {
                    carry_over(previous, rel, &mut snapshot);
                }
                continue;
            }
        };

        for path in entries {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };

            match fs.metadata(&path) {
                Ok(stamp) if stamp.is_dir => {
                    if recursive && !matcher.matches_entry(rel, true) {
                        stack.push(path.clone());
                    }
                }
                Ok(stamp) => {
                    if !matcher.matches_entry(rel, false) {
                        snapshot.insert(rel.to_path_buf(), stamp);
                    }
                }
                Err(err) => {
                    trace!(?path, error = %err, "stat failed; keeping previous state");
                    carry_over(previous, rel, &mut snapshot);
                }
            }
        }
    }

    Ok(snapshot)
}

/// Copy `rel` and everything recorded beneath it from `previous`.
fn carry_over(previous: &Snapshot, rel: &Path, snapshot: &mut Snapshot) {
    for (path, stamp) in previous.range(rel.to_path_buf()..) {
        if !path.starts_with(rel) {
            break;
        }
        snapshot.insert(path.clone(), *stamp);
    }
}

/// Compare two snapshots and describe what changed.
///
/// Created and modified entries are timestamped with the file's modification
/// time when known; removals (and stamps without a time) use `observed_at`.
pub fn diff(previous: &Snapshot, current: &Snapshot, observed_at: SystemTime) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (path, stamp) in current {
        let kind = match previous.get(path) {
            None => ChangeKind::Created,
            Some(old) if old != stamp => ChangeKind::Modified,
            Some(_) => continue,
        };
        events.push(ChangeEvent {
            path: path.clone(),
            kind,
            timestamp: stamp.modified.unwrap_or(observed_at),
        });
    }

    for path in previous.keys() {
        if !current.contains_key(path) {
            events.push(ChangeEvent {
                path: path.clone(),
                kind: ChangeKind::Removed,
                timestamp: observed_at,
            });
        }
    }

    events.sort_by(|a, b| a.path.cmp(&b.path));
    events
}
