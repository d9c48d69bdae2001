//! Consistency checks across the checkouts of a scope.
//!
//! A consistent scope has every checkout on a branch (not detached), on the
//! same branch as the others, without uncommitted changes, and with the
//! root's `.gitmodules` naming the branch each child is actually on.

use std::collections::BTreeMap;

use log::debug;

use crate::checkout::Checkout;
use crate::error::{Error, Result};
use crate::tree::ProjectTree;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsistencyOptions {
    pub permit_local_changes: bool,
}

/// Every inconsistency found, one message per problem.
pub fn problems(
    tree: &ProjectTree,
    checkouts: &[Checkout],
    options: ConsistencyOptions,
) -> Result<Vec<String>> {
    let mut problems = Vec::new();
    let mut on_branch: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for checkout in checkouts {
        if tree.git().is_detached(checkout.path())? {
            problems.push(format!("{}: HEAD is detached", checkout));
        } else if let Some(current) = tree.branches(checkout)?.current() {
            on_branch
                .entry(current.name().to_string())
                .or_default()
                .push(checkout.name());
        }
        if !options.permit_local_changes && tree.has_local_changes(checkout)? {
            problems.push(format!("{}: has uncommitted changes", checkout));
        }
    }

    if on_branch.len() > 1 {
        let summary: Vec<String> = on_branch
            .iter()
            .map(|(branch, names)| format!("{} ({})", branch, names.join(", ")))
            .collect();
        problems.push(format!(
            "checkouts are on different branches: {}",
            summary.join("; ")
        ));
    }

    if let Some(root) = tree.submodule_root() {
        let recorded = tree.git().submodule_branches(root.path())?;
        for checkout in checkouts.iter().filter(|c| c.is_submodule()) {
            let Some(expected) = recorded.get(checkout.relative_path()) else {
                continue;
            };
            let branches = tree.branches(checkout)?;
            if let Some(current) = branches.current() {
                if current.name() != expected {
                    problems.push(format!(
                        "{}: on {} but .gitmodules says {}",
                        checkout,
                        current.name(),
                        expected
                    ));
                }
            }
        }
    }

    debug!(
        "Checked {} checkout(s); {} problem(s)",
        checkouts.len(),
        problems.len()
    );
    Ok(problems)
}

/// Fails with every problem found, if there are any.
pub fn ensure_consistent(
    tree: &ProjectTree,
    checkouts: &[Checkout],
    options: ConsistencyOptions,
) -> Result<()> {
    let problems = problems(tree, checkouts, options)?;
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Preconditions { problems })
    }
}
