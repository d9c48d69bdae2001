//! # Branch Cleanup
//!
//! Finds feature branches whose work has already landed in a *safe* branch
//! (one feature work is merged into, like `develop`) and deletes them.
//!
//! A branch is a deletion candidate only if its head is an ancestor of a
//! safe remote branch with a different name. Protected branches are never
//! candidates.
//!
//! For remote branches the decision is made tree-wide: if a branch name
//! holds unmerged work in *any* checkout, that name is deleted nowhere.
//! Only branches on each checkout's default remote are considered.
//!
//! Remote knowledge is refreshed (`git fetch --all --prune`) before any
//! containment test.

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;

use crate::branch::{Branch, Branches};
use crate::checkout::Checkout;
use crate::error::{Error, Result};
use crate::tasks::{TaskList, TaskReport};
use crate::tree::ProjectTree;

/// Never deleted, whatever the configuration says.
pub const PROTECTED_BRANCHES: &[&str] = &[
    "master",
    "develop",
    "stable",
    "release/current",
    "publish",
];

pub const DEFAULT_SAFE_BRANCHES: &[&str] = &["develop", "release/current", "publish"];

/// Exact names plus regular expressions that must match a whole name.
#[derive(Debug, Clone, Default)]
pub struct BranchMatcher {
    names: BTreeSet<String>,
    patterns: Vec<Regex>,
}

impl BranchMatcher {
    pub fn new<N, P>(names: N, patterns: P) -> Result<Self>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(&format!("^(?:{})$", p.as_ref())))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            names: names.into_iter().map(Into::into).collect(),
            patterns,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.names.contains(name) || self.patterns.iter().any(|p| p.is_match(name))
    }
}

/// Which branches cleanup may touch, and whether it really deletes them.
#[derive(Debug, Clone)]
pub struct CleanupPolicy {
    pub protected: BranchMatcher,
    pub safe: BranchMatcher,
    pub cleanup_remote: bool,
    pub cleanup_local: bool,
    /// Without this, deletions are only simulated.
    pub i_understand_the_risks: bool,
}

impl CleanupPolicy {
    /// `protected_names` are added to [`PROTECTED_BRANCHES`].
    pub fn new(
        protected_names: &[String],
        protected_patterns: &[String],
        safe_names: &[String],
        safe_patterns: &[String],
    ) -> Result<Self> {
        let protected = PROTECTED_BRANCHES
            .iter()
            .map(|s| s.to_string())
            .chain(protected_names.iter().cloned());
        Ok(Self {
            protected: BranchMatcher::new(protected, protected_patterns)?,
            safe: BranchMatcher::new(safe_names.iter().cloned(), safe_patterns)?,
            cleanup_remote: true,
            cleanup_local: true,
            i_understand_the_risks: false,
        })
    }

    pub fn pretend(&self) -> bool {
        !self.i_understand_the_risks
    }

    fn is_candidate(&self, name: &str) -> bool {
        !self.protected.matches(name) && !self.safe.matches(name)
    }
}

/// A branch in a checkout, with the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CheckoutAndHead {
    pub checkout: Checkout,
    pub branch: Branch,
    pub head: String,
}

impl fmt::Display for CheckoutAndHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = &self.head[..self.head.len().min(7)];
        write!(f, "{}: {} ({})", self.checkout, self.branch, short)
    }
}

/// Branches selected for deletion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupPlan {
    pub remote: Vec<CheckoutAndHead>,
    pub local: Vec<CheckoutAndHead>,
    /// Remote branch names that hold unmerged work somewhere.
    pub unclean: BTreeSet<String>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.remote.is_empty() && self.local.is_empty()
    }
}

/// Fetches, then decides which branches can go.
pub fn plan(
    tree: &ProjectTree,
    checkouts: &[Checkout],
    policy: &CleanupPolicy,
) -> Result<CleanupPlan> {
    tree.fetch(checkouts)?;

    let mut plan = CleanupPlan::default();
    for checkout in checkouts {
        let branches = tree.branches(checkout)?;
        if policy.cleanup_remote {
            plan_remote(tree, checkout, &branches, policy, &mut plan)?;
        }
        if policy.cleanup_local {
            plan_local(tree, checkout, &branches, policy, &mut plan)?;
        }
    }

    if !plan.unclean.is_empty() {
        info!(
            "Not deleting remote branches with unmerged work in some checkout: {}",
            plan.unclean.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    let unclean = &plan.unclean;
    plan.remote
        .retain(|candidate| !unclean.contains(candidate.branch.name()));
    plan.remote.sort();
    plan.local.sort();
    Ok(plan)
}

fn plan_remote(
    tree: &ProjectTree,
    checkout: &Checkout,
    branches: &Branches,
    policy: &CleanupPolicy,
    plan: &mut CleanupPlan,
) -> Result<()> {
    let Some(default_remote) = tree.git().default_remote(checkout.path())? else {
        debug!("{} has no remote; skipping remote cleanup", checkout);
        return Ok(());
    };
    let candidates = branches.remote_branches().filter(|b| {
        b.remote_name() == Some(default_remote.as_str()) && policy.is_candidate(b.name())
    });
    for branch in candidates {
        let Some(head) = tree.git().head_of(checkout.path(), &branch.tracking_name())? else {
            continue;
        };
        match safe_container(tree, checkout, branches, policy, branch.name(), &head)? {
            Some(safe) => {
                debug!("{}: {} is contained in {}", checkout, branch, safe);
                plan.remote.push(CheckoutAndHead {
                    checkout: checkout.clone(),
                    branch: branch.clone(),
                    head,
                });
            }
            None => {
                debug!("{}: {} has unmerged work", checkout, branch);
                plan.unclean.insert(branch.name().to_string());
            }
        }
    }
    Ok(())
}

fn plan_local(
    tree: &ProjectTree,
    checkout: &Checkout,
    branches: &Branches,
    policy: &CleanupPolicy,
    plan: &mut CleanupPlan,
) -> Result<()> {
    let orphans = branches.local_branches().filter(|b| {
        branches.remote(b.name()).is_none()
            && !branches.is_on(b.name())
            && policy.is_candidate(b.name())
    });
    for branch in orphans {
        let Some(head) = tree.git().head_of(checkout.path(), branch.name())? else {
            continue;
        };
        if safe_container(tree, checkout, branches, policy, branch.name(), &head)?.is_some() {
            plan.local.push(CheckoutAndHead {
                checkout: checkout.clone(),
                branch: branch.clone(),
                head,
            });
        }
    }
    Ok(())
}

/// The first safe remote branch, other than `name`, that contains `head`.
fn safe_container<'a>(
    tree: &ProjectTree,
    checkout: &Checkout,
    branches: &'a Branches,
    policy: &CleanupPolicy,
    name: &str,
    head: &str,
) -> Result<Option<&'a Branch>> {
    for safe in branches
        .remote_branches()
        .filter(|b| b.name() != name && policy.safe.matches(b.name()))
    {
        if tree
            .git()
            .is_ancestor(checkout.path(), head, &safe.tracking_name())?
        {
            return Ok(Some(safe));
        }
    }
    Ok(None)
}

/// Deletes (or, without `i_understand_the_risks`, pretends to delete) the
/// planned branches.
pub fn execute(
    tree: &ProjectTree,
    plan: &CleanupPlan,
    policy: &CleanupPolicy,
) -> Result<TaskReport> {
    let mut remote = TaskList::new("remote branches");
    for candidate in &plan.remote {
        remote.add(format!("delete {}", candidate), move || {
            delete_remote(tree, candidate)
        });
    }
    let mut local = TaskList::new("local branches");
    for candidate in &plan.local {
        local.add(format!("delete {}", candidate), move || {
            tree.git()
                .delete_local_branch(candidate.checkout.path(), candidate.branch.name())?;
            tree.invalidate(&candidate.checkout);
            Ok(())
        });
    }

    if policy.pretend() && !plan.is_empty() {
        warn!("Simulating deletions; pass --i-understand-the-risks to delete branches");
    }
    let mut tasks = TaskList::new("branch cleanup");
    tasks.group(remote).group(local);
    tasks.run(policy.pretend())
}

fn delete_remote(tree: &ProjectTree, candidate: &CheckoutAndHead) -> Result<()> {
    let remote = candidate.branch.remote_name().unwrap_or_default();
    let result = tree.git().delete_remote_branch(
        candidate.checkout.path(),
        remote,
        candidate.branch.name(),
    );
    tree.invalidate(&candidate.checkout);
    match result {
        Err(Error::GitCommand { stderr, .. }) if stderr.contains("remote ref does not exist") => {
            warn!("{} was already deleted on {}", candidate, remote);
            Ok(())
        }
        other => other,
    }
}
