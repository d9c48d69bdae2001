//! # Branch Model
//!
//! Types describing the branches of a single checkout, as reported by
//! `git branch --no-color -a`.
//!
//! - **`Branch`**: a local branch, or a branch on a specific remote. A local
//!   `develop` and `origin/develop` are two different values.
//! - **`Branches`**: an immutable snapshot of every branch in a checkout plus
//!   the branch that is currently checked out, if any. The current branch is
//!   always a member of the set and always local.
//!
//! Snapshots are produced fresh from git and cached by
//! [`crate::tree::ProjectTree`] until a mutating operation invalidates them.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// The remote that is preferred when a branch exists on several remotes.
pub const PREFERRED_REMOTE: &str = "origin";

/// A named ref, either local or on a remote.
///
/// Ordering is by name, then by remote, with local branches sorting before
/// remote branches of the same name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Branch {
    name: String,
    remote: Option<String>,
}

impl Branch {
    /// Creates a local branch.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: None,
        }
    }

    /// Creates a branch on the given remote.
    pub fn remote(remote: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: Some(remote.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn remote_name(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    pub fn is_local(&self) -> bool {
        self.remote.is_none()
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// `remote/name` for remote branches, `name` for local ones. This is the
    /// form git accepts as a start point when creating a tracking branch.
    pub fn tracking_name(&self) -> String {
        match &self.remote {
            Some(remote) => format!("{}/{}", remote, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tracking_name())
    }
}

/// Every branch of one checkout, plus the current branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branches {
    branches: BTreeSet<Branch>,
    current: Option<Branch>,
}

impl Branches {
    /// Builds a snapshot, checking that `current` is a local member of the
    /// set.
    pub fn new(
        branches: impl IntoIterator<Item = Branch>,
        current: Option<Branch>,
    ) -> Result<Self> {
        let branches: BTreeSet<Branch> = branches.into_iter().collect();
        if let Some(current) = &current {
            if current.is_remote() {
                return Err(Error::InvalidBranches {
                    message: format!("current branch {} is a remote branch", current),
                });
            }
            if !branches.contains(current) {
                return Err(Error::InvalidBranches {
                    message: format!("current branch {} is not among the branches", current),
                });
            }
        }
        Ok(Self { branches, current })
    }

    /// Parses the output of `git branch --no-color -a`.
    ///
    /// Symbolic entries (`remotes/origin/HEAD -> origin/develop`) and the
    /// detached-HEAD pseudo entry are skipped. A detached checkout therefore
    /// has no current branch.
    pub fn parse(output: &str) -> Result<Self> {
        let mut branches = BTreeSet::new();
        let mut current = None;

        for line in output.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }

            let (is_current, entry) = match line.strip_prefix("* ") {
                Some(rest) => (true, rest.trim()),
                None => (false, line.trim_start_matches(['+', ' '])),
            };

            // "(HEAD detached at 1a2b3c4)", "(no branch)"
            if entry.starts_with('(') || entry.contains(" -> ") {
                continue;
            }

            let branch = match entry.strip_prefix("remotes/") {
                Some(remote_ref) => match remote_ref.split_once('/') {
                    Some((remote, name)) => Branch::remote(remote, name),
                    None => continue,
                },
                None => Branch::local(entry),
            };

            if is_current {
                current = Some(branch.clone());
            }
            branches.insert(branch);
        }

        Self::new(branches, current)
    }

    pub fn current(&self) -> Option<&Branch> {
        self.current.as_ref()
    }

    /// True if `name` is the checked out branch.
    pub fn is_on(&self, name: &str) -> bool {
        self.current.as_ref().is_some_and(|b| b.name() == name)
    }

    pub fn is_detached(&self) -> bool {
        self.current.is_none()
    }

    pub fn local(&self, name: &str) -> Option<&Branch> {
        self.branches
            .iter()
            .find(|b| b.is_local() && b.name() == name)
    }

    /// The remote branch called `name`, preferring the `origin` remote.
    pub fn remote(&self, name: &str) -> Option<&Branch> {
        self.remote_in(name, PREFERRED_REMOTE).or_else(|| {
            self.branches
                .iter()
                .find(|b| b.is_remote() && b.name() == name)
        })
    }

    pub fn remote_in(&self, name: &str, remote: &str) -> Option<&Branch> {
        self.branches
            .iter()
            .find(|b| b.name() == name && b.remote_name() == Some(remote))
    }

    pub fn local_branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(|b| b.is_local())
    }

    pub fn remote_branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(|b| b.is_remote())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Checks a branch name against git's ref-name rules.
///
/// This runs before any git I/O so that a typo in an option fails the whole
/// operation up front.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::InvalidBranchName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return invalid("is empty");
    }
    if name == "@" || name == "HEAD" {
        return invalid("is reserved");
    }
    if name.starts_with('-') {
        return invalid("starts with '-'");
    }
    if name.starts_with('/') || name.ends_with('/') {
        return invalid("starts or ends with '/'");
    }
    if name.ends_with('.') || name.ends_with(".lock") {
        return invalid("ends with '.' or '.lock'");
    }
    for sequence in ["..", "//", "@{"] {
        if name.contains(sequence) {
            return invalid(&format!("contains '{}'", sequence));
        }
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
    {
        return invalid(&format!("contains {:?}", c));
    }
    if name.split('/').any(|component| component.starts_with('.')) {
        return invalid("has a path component starting with '.'");
    }
    Ok(())
}
