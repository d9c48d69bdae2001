//! A single git working copy within a tree of submodules.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A git working copy. Identity, equality and ordering are all by its
/// canonical root path.
///
/// Dynamic state such as the current branch or dirtiness is not stored here;
/// it is looked up (and cached) through [`crate::tree::ProjectTree`].
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    path: PathBuf,
    /// Path relative to the submodule root; empty for the root itself.
    relative_path: PathBuf,
    submodule_root: bool,
    submodule: bool,
}

impl Checkout {
    /// The top-level checkout of a tree. It is a submodule root only if it
    /// actually declares submodules.
    pub fn root(path: impl Into<PathBuf>, has_submodules: bool) -> Self {
        Self {
            path: path.into(),
            relative_path: PathBuf::new(),
            submodule_root: has_submodules,
            submodule: false,
        }
    }

    /// A submodule checkout at `relative_path` below `root`.
    pub fn submodule(root: &Path, relative_path: impl Into<PathBuf>) -> Self {
        let relative_path = relative_path.into();
        Self {
            path: root.join(&relative_path),
            relative_path,
            submodule_root: false,
            submodule: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn is_submodule_root(&self) -> bool {
        self.submodule_root
    }

    pub fn is_submodule(&self) -> bool {
        self.submodule
    }

    /// Number of path components below the submodule root.
    pub fn depth(&self) -> usize {
        self.relative_path.components().count()
    }

    /// Short human-readable name: the relative path, or the directory name
    /// for the root.
    pub fn name(&self) -> String {
        if self.relative_path.as_os_str().is_empty() {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        } else {
            self.relative_path.display().to_string()
        }
    }

    /// True if `dir` is this checkout's root or lies inside it.
    pub fn contains(&self, dir: &Path) -> bool {
        dir.starts_with(&self.path)
    }
}

impl PartialEq for Checkout {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Checkout {}

impl std::hash::Hash for Checkout {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl PartialOrd for Checkout {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Checkout {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl fmt::Display for Checkout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
