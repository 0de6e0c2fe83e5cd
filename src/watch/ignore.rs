// src/watch/ignore.rs

//! Gitignore-style path exclusion.
//!
//! Rules are read from [`IGNORE_FILE_NAME`] at the watched root and compiled
//! with [`GitignoreBuilder`]. Matching is a pure function of the compiled
//! rules and the queried path; nothing here touches the filesystem after
//! [`IgnoreMatcher::load`] returns.
//!
//! A line that does not compile is skipped on its own. Only a file that
//! cannot be read or built at all degrades to a matcher that excludes
//! nothing.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

use crate::fs::FileSystem;

/// Well-known ignore file looked up at the watched root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Pure predicate over compiled ignore rules anchored at a root directory.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    root: PathBuf,
    rules: Gitignore,
    skipped: usize,
}

impl IgnoreMatcher {
    /// Load `.gitignore` from `root`, degrading to an empty matcher when the
    /// file is missing or unusable.
    pub fn load(fs: &dyn FileSystem, root: &Path) -> Self {
        let path = root.join(IGNORE_FILE_NAME);
        if !fs.is_file(&path) {
            debug!(?path, "no ignore file; nothing will be excluded");
            return Self::empty(root);
        }

        let matcher = fs
            .read_to_string(&path)
            .and_then(|contents| Self::parse(root, &contents));
        match matcher {
            Ok(matcher) => {
                debug!(
                    ?path,
                    rules = matcher.len(),
                    skipped = matcher.skipped(),
                    "loaded ignore rules"
                );
                matcher
            }
            Err(err) => {
                debug!(?path, error = %err, "ignore file unusable; nothing will be excluded");
                Self::empty(root)
            }
        }
    }

    /// Compile the contents of an ignore file for `root`.
    ///
    /// Lines that fail to compile are skipped and counted in
    /// [`IgnoreMatcher::skipped`].
    pub fn parse(root: impl Into<PathBuf>, contents: &str) -> Result<Self> {
        let root = root.into();
        let mut builder = GitignoreBuilder::new(&root);
        let mut skipped = 0;

        for (idx, line) in contents.lines().enumerate() {
            if let Err(err) = builder.add_line(None, line) {
                debug!(line = idx + 1, error = %err, "skipping invalid ignore pattern");
                skipped += 1;
            }
        }

        let rules = builder
            .build()
            .with_context(|| format!("compiling ignore rules for {:?}", root))?;

        Ok(Self {
            root,
            rules,
            skipped,
        })
    }

    /// A matcher that excludes nothing.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rules: Gitignore::empty(),
            skipped: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of compiled rules, negations included.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Lines dropped because they did not compile.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// True if `path` is excluded. A trailing `/` marks the path as a directory.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let is_dir = path.as_os_str().to_string_lossy().ends_with('/');
        self.matches_entry(path, is_dir)
    }

    /// True if `path` is excluded, given whether it names a directory.
    ///
    /// An excluded ancestor directory excludes the path, and a later `!`
    /// rule cannot re-include it.
    pub fn matches_entry(&self, path: &Path, is_dir: bool) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let Some(rel) = self.relative(path) else {
            return false;
        };

        let excluded_ancestor = rel
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .any(|dir| self.rules.matched(dir, true).is_ignore());

        excluded_ancestor || self.rules.matched(&rel, is_dir).is_ignore()
    }

    /// Normalise `path` to a root-relative path.
    ///
    /// Returns `None` for absolute paths outside the root, for paths that
    /// climb out of it with `..`, and for the root itself.
    fn relative(&self, path: &Path) -> Option<PathBuf> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };

        let mut out = PathBuf::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if out.as_os_str().is_empty() {
            None
        } else {
            Some(out)
        }
    }
}
