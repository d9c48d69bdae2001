//! # Automerge Tagging
//!
//! Marks checkouts whose target branch has work the stable branch does not
//! have yet. Each such checkout gets an `automerge-...` tag on its current
//! head, which downstream automation picks up and merges.
//!
//! Tag pushes are best effort: a checkout without a remote, or a rejected
//! push, is logged as a warning and the remaining checkouts are still
//! processed.

use log::{debug, info, warn};
use serde::Serialize;

use crate::branch::Branch;
use crate::checkout::Checkout;
use crate::cleanup::CheckoutAndHead;
use crate::error::Result;
use crate::tasks::{TaskList, TaskReport};
use crate::tree::ProjectTree;

const SHORT_HEAD_LENGTH: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomergeOptions {
    pub target_branch: String,
    pub stable_branch: String,
    pub push: bool,
    pub pretend: bool,
}

/// `automerge-feature-x-1a2b3c4` for `feature/x` at `1a2b3c4...`.
pub fn tag_name(target_branch: &str, head: &str) -> String {
    format!(
        "automerge-{}-{}",
        target_branch.replace('/', "-"),
        &head[..head.len().min(SHORT_HEAD_LENGTH)]
    )
}

/// Fetches, then picks the checkouts on the target branch whose head is not
/// already contained in the remote stable branch.
pub fn plan(
    tree: &ProjectTree,
    checkouts: &[Checkout],
    options: &AutomergeOptions,
) -> Result<Vec<CheckoutAndHead>> {
    tree.fetch(checkouts)?;

    let git = tree.git();
    let mut candidates = Vec::new();
    for checkout in checkouts {
        let branches = tree.branches(checkout)?;
        if !branches.is_on(&options.target_branch) {
            debug!(
                "{} is not on {}; skipping",
                checkout, options.target_branch
            );
            continue;
        }
        let Some(head) = git.head_of(checkout.path(), "HEAD")? else {
            continue;
        };
        if let Some(stable) = branches.remote(&options.stable_branch) {
            if git.is_ancestor(checkout.path(), &head, &stable.tracking_name())? {
                debug!("{}: {} already contains {}", checkout, stable, head);
                continue;
            }
        }
        candidates.push(CheckoutAndHead {
            checkout: checkout.clone(),
            branch: Branch::local(options.target_branch.as_str()),
            head,
        });
    }
    candidates.sort();
    Ok(candidates)
}

/// Tags every candidate, then pushes the tags if asked to.
pub fn execute(
    tree: &ProjectTree,
    candidates: &[CheckoutAndHead],
    options: &AutomergeOptions,
) -> Result<TaskReport> {
    let mut tag = TaskList::new("tag");
    let mut push = TaskList::new("push");
    for candidate in candidates {
        let name = tag_name(&options.target_branch, &candidate.head);
        let dir = candidate.checkout.path();
        tag.add(format!("{}: tag {}", candidate.checkout, name), {
            let name = name.clone();
            move || {
                let git = tree.git();
                if git.head_of(dir, &format!("refs/tags/{}", name))?.is_some() {
                    info!("{}: tag {} already exists", candidate.checkout, name);
                    return Ok(());
                }
                git.tag(dir, &name, &candidate.head)?;
                info!(
                    "{}: tagged {} as {}",
                    candidate.checkout, candidate.head, name
                );
                Ok(())
            }
        });
        if options.push {
            push.add(format!("{}: push {}", candidate.checkout, name), move || {
                push_tag(tree, candidate, &name);
                Ok(())
            });
        }
    }

    let mut tasks = TaskList::new(format!("automerge {}", options.target_branch));
    tasks.group(tag).group(push);
    tasks.run(options.pretend)
}

fn push_tag(tree: &ProjectTree, candidate: &CheckoutAndHead, name: &str) {
    let git = tree.git();
    let dir = candidate.checkout.path();
    let remote = match git.default_remote(dir) {
        Ok(Some(remote)) => remote,
        Ok(None) => {
            warn!("{}: no remote to push tag {} to", candidate.checkout, name);
            return;
        }
        Err(e) => {
            warn!("{}: could not find a remote: {}", candidate.checkout, e);
            return;
        }
    };
    if let Err(e) = git.push_tag(dir, &remote, name) {
        warn!(
            "{}: pushing tag {} to {} failed: {}",
            candidate.checkout, name, remote, e
        );
    }
}
