//! # Git Collaborator Seam
//!
//! Every git interaction the decision engines need goes through the
//! [`GitOperations`] trait. The engines only ever see a `&dyn GitOperations`,
//! which keeps their decision tables testable without real repositories.
//!
//! - **`DefaultGitOperations`** delegates to the functions in [`crate::git`]
//!   (and [`crate::gitmodules`] for `.gitmodules` edits), which run the system
//!   `git` binary.
//! - Tests use an in-memory model of a checkout tree that records each
//!   mutating call.
//!
//! All operations take the checkout's root directory as their first
//! argument.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::branch::Branches;
use crate::error::Result;

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Every local and remote branch, with the current one marked.
    fn branches(&self, dir: &Path) -> Result<Branches>;

    /// Uncommitted changes of any kind, untracked files included.
    fn has_local_changes(&self, dir: &Path) -> Result<bool>;

    /// Working tree differs from the index.
    fn is_dirty(&self, dir: &Path) -> Result<bool>;

    /// Index differs from HEAD.
    fn has_staged_changes(&self, dir: &Path) -> Result<bool>;

    fn is_detached(&self, dir: &Path) -> Result<bool>;

    /// Commit id of `reference`, or `None` if it does not resolve.
    fn head_of(&self, dir: &Path, reference: &str) -> Result<Option<String>>;

    fn is_ancestor(&self, dir: &Path, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Number of commits reachable from `to` but not from `from`.
    fn commits_between(&self, dir: &Path, from: &str, to: &str) -> Result<usize>;

    fn default_remote(&self, dir: &Path) -> Result<Option<String>>;

    fn fetch_all(&self, dir: &Path) -> Result<()>;

    fn pull(&self, dir: &Path) -> Result<()>;

    fn push_new_branch(&self, dir: &Path, remote: &str, branch: &str) -> Result<()>;

    /// Creates `name` from `start_point` (HEAD when `None`) and checks it out.
    fn create_branch(&self, dir: &Path, name: &str, start_point: Option<&str>) -> Result<()>;

    /// Checks out a branch or a raw commit id.
    fn switch_to(&self, dir: &Path, reference: &str) -> Result<()>;

    /// Stages `paths`, relative to `dir`.
    fn add_paths(&self, dir: &Path, paths: &[&Path]) -> Result<()>;

    fn commit(&self, dir: &Path, message: &str) -> Result<()>;

    fn tag(&self, dir: &Path, name: &str, commit: &str) -> Result<()>;

    fn push_tag(&self, dir: &Path, remote: &str, tag: &str) -> Result<()>;

    fn delete_local_branch(&self, dir: &Path, name: &str) -> Result<()>;

    fn delete_remote_branch(&self, dir: &Path, remote: &str, name: &str) -> Result<()>;

    /// Points the `.gitmodules` entry of `submodule_path` in `root` at
    /// `branch`. Returns whether the file changed.
    fn set_submodule_branch(&self, root: &Path, submodule_path: &Path, branch: &str)
        -> Result<bool>;

    /// The `branch` entries of `root/.gitmodules`, keyed by submodule path.
    fn submodule_branches(&self, root: &Path) -> Result<BTreeMap<PathBuf, String>>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real git operations.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn branches(&self, dir: &Path) -> Result<Branches> {
        crate::git::branches(dir)
    }

    fn has_local_changes(&self, dir: &Path) -> Result<bool> {
        crate::git::has_local_changes(dir)
    }

    fn is_dirty(&self, dir: &Path) -> Result<bool> {
        crate::git::is_dirty(dir)
    }

    fn has_staged_changes(&self, dir: &Path) -> Result<bool> {
        crate::git::has_staged_changes(dir)
    }

    fn is_detached(&self, dir: &Path) -> Result<bool> {
        crate::git::is_detached(dir)
    }

    fn head_of(&self, dir: &Path, reference: &str) -> Result<Option<String>> {
        crate::git::head_of(dir, reference)
    }

    fn is_ancestor(&self, dir: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
        crate::git::is_ancestor(dir, ancestor, descendant)
    }

    fn commits_between(&self, dir: &Path, from: &str, to: &str) -> Result<usize> {
        crate::git::commits_between(dir, from, to)
    }

    fn default_remote(&self, dir: &Path) -> Result<Option<String>> {
        crate::git::default_remote(dir)
    }

    fn fetch_all(&self, dir: &Path) -> Result<()> {
        crate::git::fetch_all(dir)
    }

    fn pull(&self, dir: &Path) -> Result<()> {
        crate::git::pull(dir)
    }

    fn push_new_branch(&self, dir: &Path, remote: &str, branch: &str) -> Result<()> {
        crate::git::push_new_branch(dir, remote, branch)
    }

    fn create_branch(&self, dir: &Path, name: &str, start_point: Option<&str>) -> Result<()> {
        crate::git::create_branch(dir, name, start_point)
    }

    fn switch_to(&self, dir: &Path, reference: &str) -> Result<()> {
        crate::git::switch_to(dir, reference)
    }

    fn add_paths(&self, dir: &Path, paths: &[&Path]) -> Result<()> {
        crate::git::add_paths(dir, paths)
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<()> {
        crate::git::commit(dir, message)
    }

    fn tag(&self, dir: &Path, name: &str, commit: &str) -> Result<()> {
        crate::git::tag(dir, name, commit)
    }

    fn push_tag(&self, dir: &Path, remote: &str, tag: &str) -> Result<()> {
        crate::git::push_tag(dir, remote, tag)
    }

    fn delete_local_branch(&self, dir: &Path, name: &str) -> Result<()> {
        crate::git::delete_local_branch(dir, name)
    }

    fn delete_remote_branch(&self, dir: &Path, remote: &str, name: &str) -> Result<()> {
        crate::git::delete_remote_branch(dir, remote, name)
    }

    fn set_submodule_branch(
        &self,
        root: &Path,
        submodule_path: &Path,
        branch: &str,
    ) -> Result<bool> {
        crate::gitmodules::set_branch(root, submodule_path, branch)
    }

    fn submodule_branches(&self, root: &Path) -> Result<BTreeMap<PathBuf, String>> {
        Ok(crate::gitmodules::read(root)?
            .into_iter()
            .filter_map(|s| s.branch.map(|branch| (s.path, branch)))
            .collect())
    }
}
