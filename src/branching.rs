//! # Branching Decision Engine
//!
//! Moves a set of checkouts onto a common branch.
//!
//! Work happens in three passes over a [`BranchingBatch`]:
//!
//! 1. **Decide**: every checkout gets exactly one [`BranchingAction`], based
//!    on which branches exist locally and remotely and where the checkout
//!    currently is.
//! 2. **Validate**: the whole batch is checked before anything is touched.
//!    Every problem in every checkout is collected, and if there is even one
//!    the batch is rejected. A tree where some checkouts moved and others did
//!    not is never produced by a validation failure.
//! 3. **Execute**: actions run root first, then deepest checkouts first.
//!    Post-actions then run in the reverse order: each child records its new
//!    branch in the root's `.gitmodules`, and finally the root commits.
//!
//! Execution failures abort immediately. Nothing is rolled back.
//!
//! ## Choosing a start point
//!
//! A new branch is created from the base branch. When the checkout is
//! already on the base branch and has work of its own (unpushed commits or
//! uncommitted changes), that work is assumed to belong to the new branch
//! and the branch starts at the local head. Otherwise it starts at the
//! remote head of the base branch, so unrelated local commits are not swept
//! into it. See [`base_branch_for`].

use std::cell::Cell;
use std::cmp::{Ordering, Reverse};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::branch::{validate_branch_name, Branch, Branches};
use crate::checkout::Checkout;
use crate::error::{Error, Result};
use crate::gitmodules::GITMODULES;
use crate::tasks::{TaskList, TaskReport};
use crate::tree::ProjectTree;

/// Message used for the root commit; `{branch}` is replaced.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update .gitmodules: move submodules to branch {branch}";

/// The branch checkouts should end up on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Just get everyone onto the base branch.
    #[default]
    UseBase,
    Named(String),
}

impl Target {
    pub fn from_option(name: Option<String>) -> Self {
        name.map_or(Target::UseBase, Target::Named)
    }

    /// The branch name this target resolves to.
    pub fn name<'a>(&'a self, base_branch: &'a str) -> &'a str {
        match self {
            Target::UseBase => base_branch,
            Target::Named(name) => name,
        }
    }
}

/// Sends one submodule to a specific ref while the rest go to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchOverride {
    /// Path relative to the submodule root, or the checkout's directory name.
    pub submodule: String,
    /// Branch name or commit id.
    pub reference: String,
}

impl BranchOverride {
    pub fn matches(&self, checkout: &Checkout) -> bool {
        checkout.relative_path() == Path::new(&self.submodule)
            || checkout.path().file_name() == Some(OsStr::new(&self.submodule))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchingOptions {
    pub target: Target,
    pub base_branch: String,
    pub create_branches: bool,
    pub create_local_branches: bool,
    pub permit_local_changes: bool,
    pub push: bool,
    /// Record branch changes in the root's `.gitmodules` and commit them.
    pub update_root: bool,
    pub pretend: bool,
    pub branch_override: Option<BranchOverride>,
    pub commit_message: String,
}

impl BranchingOptions {
    pub fn new(base_branch: impl Into<String>) -> Self {
        Self {
            target: Target::UseBase,
            base_branch: base_branch.into(),
            create_branches: false,
            create_local_branches: false,
            permit_local_changes: false,
            push: false,
            update_root: true,
            pretend: false,
            branch_override: None,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }

    pub fn target_branch(&self) -> &str {
        self.target.name(&self.base_branch)
    }

    /// Rejects malformed branch names before any git I/O.
    pub fn validate(&self) -> Result<()> {
        validate_branch_name(&self.base_branch)?;
        if let Target::Named(name) = &self.target {
            validate_branch_name(name)?;
        }
        if let Some(branch_override) = &self.branch_override {
            if branch_override.submodule.trim().is_empty() {
                return Err(Error::config("the override submodule is empty"));
            }
            validate_branch_name(&branch_override.reference)?;
        }
        Ok(())
    }

    fn can_create(&self) -> bool {
        self.create_branches || self.create_local_branches
    }

    fn root_commit_message(&self) -> String {
        self.commit_message
            .replace("{branch}", self.target_branch())
    }
}

/// What to do with one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum BranchingAction {
    DoNothing,
    PullOnly,
    /// Check out an existing local branch, or a raw commit id.
    SwitchToExistingLocal { reference: String },
    CreateAndSwitchToBranch {
        branch: String,
        /// `None` means the current local head.
        start_point: Option<Branch>,
        local_changes_ok: bool,
        push: bool,
    },
    FailureBranching { reason: String },
}

impl BranchingAction {
    /// Whether the checkout ends up on a different ref.
    pub fn changes_branch(&self) -> bool {
        matches!(
            self,
            BranchingAction::SwitchToExistingLocal { .. }
                | BranchingAction::CreateAndSwitchToBranch { .. }
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, BranchingAction::FailureBranching { .. })
    }

    fn tolerates_local_changes(&self) -> bool {
        match self {
            BranchingAction::CreateAndSwitchToBranch {
                local_changes_ok, ..
            } => *local_changes_ok,
            BranchingAction::FailureBranching { .. } => false,
            _ => true,
        }
    }
}

impl fmt::Display for BranchingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchingAction::DoNothing => f.write_str("nothing to do"),
            BranchingAction::PullOnly => f.write_str("pull"),
            BranchingAction::SwitchToExistingLocal { reference } => {
                write!(f, "switch to {}", reference)
            }
            BranchingAction::CreateAndSwitchToBranch {
                branch,
                start_point,
                push,
                ..
            } => {
                match start_point {
                    Some(start) => write!(f, "create {} from {}", branch, start)?,
                    None => write!(f, "create {} from local head", branch)?,
                }
                if *push {
                    f.write_str(" and push")?;
                }
                Ok(())
            }
            BranchingAction::FailureBranching { reason } => write!(f, "cannot branch: {}", reason),
        }
    }
}

/// Prefers the local copy of `lookup` when the checkout is on `base_branch`
/// (its local work should be included), and the remote copy otherwise (its
/// local work belongs to something else).
pub fn base_branch_for<'a>(
    branches: &'a Branches,
    lookup: &str,
    base_branch: &str,
) -> Option<&'a Branch> {
    if branches.is_on(base_branch) {
        branches.local(lookup).or_else(|| branches.remote(lookup))
    } else {
        branches.remote(lookup).or_else(|| branches.local(lookup))
    }
}

/// Classifies one checkout.
pub fn decide(
    tree: &ProjectTree,
    checkout: &Checkout,
    options: &BranchingOptions,
) -> Result<BranchingAction> {
    let branches = tree.branches(checkout)?;
    let base = options.base_branch.as_str();
    let target = options.target_branch();

    if let Some(branch_override) = &options.branch_override {
        if branch_override.matches(checkout) && branch_override.reference != target {
            return Ok(BranchingAction::SwitchToExistingLocal {
                reference: branch_override.reference.clone(),
            });
        }
    }

    if branches.local(base).is_none() && branches.remote(base).is_none() {
        return Ok(BranchingAction::FailureBranching {
            reason: format!("base branch {} exists neither locally nor remotely", base),
        });
    }

    let name = match &options.target {
        Target::UseBase => return decide_base(tree, checkout, &branches, options),
        Target::Named(name) => name.as_str(),
    };

    if branches.is_on(name) {
        return stay_or_pull(tree, checkout, &branches, name);
    }
    if branches.local(name).is_some() {
        return Ok(BranchingAction::SwitchToExistingLocal {
            reference: name.to_string(),
        });
    }
    if let Some(remote) = branches.remote(name) {
        if options.can_create() {
            return Ok(BranchingAction::CreateAndSwitchToBranch {
                branch: name.to_string(),
                start_point: Some(remote.clone()),
                local_changes_ok: options.permit_local_changes,
                push: false,
            });
        }
        debug!(
            "{}: {} exists only on {}; staying with {}",
            checkout,
            name,
            remote.remote_name().unwrap_or_default(),
            base
        );
        return decide_base(tree, checkout, &branches, options);
    }

    let on_base = branches.is_on(base);
    if !options.create_branches {
        return Ok(if on_base {
            BranchingAction::DoNothing
        } else {
            BranchingAction::FailureBranching {
                reason: format!("branch {} does not exist and branch creation is off", name),
            }
        });
    }

    let has_own_work = on_base && has_unpublished_work(tree, checkout, &branches, base)?;
    let start_point = if has_own_work {
        None
    } else if on_base {
        branches
            .remote(base)
            .or_else(|| branches.local(base))
            .cloned()
    } else {
        base_branch_for(&branches, base, base).cloned()
    };
    Ok(BranchingAction::CreateAndSwitchToBranch {
        branch: name.to_string(),
        start_point,
        local_changes_ok: options.permit_local_changes
            || has_own_work
            || checkout.is_submodule_root(),
        push: options.push,
    })
}

fn decide_base(
    tree: &ProjectTree,
    checkout: &Checkout,
    branches: &Branches,
    options: &BranchingOptions,
) -> Result<BranchingAction> {
    let base = options.base_branch.as_str();
    match (branches.local(base), branches.remote(base)) {
        (None, Some(remote)) if options.can_create() => {
            Ok(BranchingAction::CreateAndSwitchToBranch {
                branch: base.to_string(),
                start_point: Some(remote.clone()),
                local_changes_ok: options.permit_local_changes,
                push: false,
            })
        }
        (None, Some(_)) => Ok(BranchingAction::FailureBranching {
            reason: format!(
                "base branch {} exists only remotely and branch creation is off",
                base
            ),
        }),
        (Some(_), _) if branches.is_on(base) => stay_or_pull(tree, checkout, branches, base),
        (Some(_), _) => Ok(BranchingAction::SwitchToExistingLocal {
            reference: base.to_string(),
        }),
        (None, None) => Ok(BranchingAction::FailureBranching {
            reason: format!("base branch {} exists neither locally nor remotely", base),
        }),
    }
}

/// `DoNothing`, unless the local branch is behind its remote.
fn stay_or_pull(
    tree: &ProjectTree,
    checkout: &Checkout,
    branches: &Branches,
    name: &str,
) -> Result<BranchingAction> {
    let (Some(local), Some(remote)) = (branches.local(name), branches.remote(name)) else {
        return Ok(BranchingAction::DoNothing);
    };
    let behind = tree.git().commits_between(
        checkout.path(),
        &local.tracking_name(),
        &remote.tracking_name(),
    )?;
    Ok(if behind > 0 {
        BranchingAction::PullOnly
    } else {
        BranchingAction::DoNothing
    })
}

/// Unpushed commits on `base`, or uncommitted changes.
fn has_unpublished_work(
    tree: &ProjectTree,
    checkout: &Checkout,
    branches: &Branches,
    base: &str,
) -> Result<bool> {
    if tree.has_local_changes(checkout)? {
        return Ok(true);
    }
    let (Some(local), Some(remote)) = (branches.local(base), branches.remote(base)) else {
        return Ok(branches.local(base).is_some());
    };
    let ahead = tree.git().commits_between(
        checkout.path(),
        &remote.tracking_name(),
        &local.tracking_name(),
    )?;
    Ok(ahead > 0)
}

/// The decision for one checkout, plus whether carrying it out succeeded.
#[derive(Debug, Serialize)]
pub struct BranchingBehavior {
    checkout: Checkout,
    target: String,
    action: BranchingAction,
    pretend: bool,
    succeeded: Cell<bool>,
}

impl BranchingBehavior {
    pub fn new(
        checkout: Checkout,
        target: impl Into<String>,
        action: BranchingAction,
        pretend: bool,
    ) -> Self {
        Self {
            checkout,
            target: target.into(),
            action,
            pretend,
            succeeded: Cell::new(false),
        }
    }

    pub fn checkout(&self) -> &Checkout {
        &self.checkout
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn action(&self) -> &BranchingAction {
        &self.action
    }

    /// Set only once the action really ran.
    pub fn succeeded(&self) -> bool {
        self.succeeded.get()
    }

    /// Root first, then deeper checkouts, then reverse path order.
    pub fn execution_order(&self, other: &Self) -> Ordering {
        let key = |b: &Self| {
            (
                !b.checkout.is_submodule_root(),
                Reverse(b.checkout.depth()),
                Reverse(b.checkout.path().to_path_buf()),
            )
        };
        key(self).cmp(&key(other))
    }

    /// Adds any reason this behavior must not run to `problems`.
    pub fn validate(
        &self,
        tree: &ProjectTree,
        options: &BranchingOptions,
        problems: &mut Vec<String>,
    ) -> Result<()> {
        if let BranchingAction::FailureBranching { reason } = &self.action {
            problems.push(format!("{}: {}", self.checkout, reason));
            return Ok(());
        }
        if self.action.tolerates_local_changes()
            || options.permit_local_changes
            || self.checkout.is_submodule_root()
        {
            return Ok(());
        }
        if tree.has_local_changes(&self.checkout)? {
            problems.push(format!(
                "{}: has local changes that would be left behind ({})",
                self.checkout, self.action
            ));
        }
        Ok(())
    }

    /// Carries out the action.
    pub fn run(&self, tree: &ProjectTree) -> Result<()> {
        let dir = self.checkout.path();
        let git = tree.git();
        match &self.action {
            BranchingAction::DoNothing => {}
            BranchingAction::PullOnly => git.pull(dir)?,
            BranchingAction::SwitchToExistingLocal { reference } => git.switch_to(dir, reference)?,
            BranchingAction::CreateAndSwitchToBranch {
                branch,
                start_point,
                push,
                ..
            } => {
                let start = start_point.as_ref().map(Branch::tracking_name);
                git.create_branch(dir, branch, start.as_deref())?;
                if *push {
                    let remote = git.default_remote(dir)?.ok_or_else(|| Error::Config {
                        message: format!("{} has no remote to push {} to", self.checkout, branch),
                        hint: Some("add a remote, or run without --push".to_string()),
                    })?;
                    git.push_new_branch(dir, &remote, branch)?;
                }
            }
            BranchingAction::FailureBranching { reason } => {
                return Err(Error::Preconditions {
                    problems: vec![format!("{}: {}", self.checkout, reason)],
                });
            }
        }
        tree.invalidate(&self.checkout);
        if !matches!(self.action, BranchingAction::DoNothing) {
            info!("{}: {}", self.checkout, self.action);
        }
        self.succeeded.set(!self.pretend);
        Ok(())
    }

    /// Records a child's new branch in the root's `.gitmodules`, or commits
    /// the root once all children are done. The root commit stages only
    /// `.gitmodules` and `submodule_paths`.
    pub fn post_run(
        &self,
        tree: &ProjectTree,
        options: &BranchingOptions,
        submodule_paths: &[PathBuf],
    ) -> Result<()> {
        if !self.succeeded() || !options.update_root {
            return Ok(());
        }
        if self.checkout.is_submodule_root() {
            return commit_root(
                tree,
                &self.checkout,
                submodule_paths,
                &options.root_commit_message(),
            );
        }
        if !self.action.changes_branch() {
            return Ok(());
        }
        let Some(root) = tree.submodule_root() else {
            return Ok(());
        };
        let branches = tree.branches(&self.checkout)?;
        let Some(current) = branches.current() else {
            debug!(
                "{} is detached after switching; leaving .gitmodules alone",
                self.checkout
            );
            return Ok(());
        };
        if tree.git().set_submodule_branch(
            root.path(),
            self.checkout.relative_path(),
            current.name(),
        )? {
            tree.invalidate(root);
        }
        Ok(())
    }
}

/// Stages and commits the root, but only if something is actually staged.
/// Untracked and unrelated files in the root are left alone.
fn commit_root(
    tree: &ProjectTree,
    root: &Checkout,
    submodule_paths: &[PathBuf],
    message: &str,
) -> Result<()> {
    tree.invalidate(root);
    if !tree.is_dirty(root)? {
        debug!("{} has no tracked changes; nothing to commit", root);
        return Ok(());
    }
    let git = tree.git();
    let mut paths = vec![Path::new(GITMODULES)];
    paths.extend(submodule_paths.iter().map(PathBuf::as_path));
    git.add_paths(root.path(), &paths)?;
    if !git.has_staged_changes(root.path())? {
        debug!("{} reported changes but nothing was staged", root);
        return Ok(());
    }
    git.commit(root.path(), message)?;
    tree.invalidate(root);
    info!("{}: committed \"{}\"", root, message);
    Ok(())
}

/// Every checkout's decision for one run, in execution order.
#[derive(Debug, Serialize)]
pub struct BranchingBatch {
    options: BranchingOptions,
    behaviors: Vec<BranchingBehavior>,
}

impl BranchingBatch {
    /// Decides an action for each checkout.
    pub fn plan(
        tree: &ProjectTree,
        checkouts: &[Checkout],
        options: BranchingOptions,
    ) -> Result<Self> {
        options.validate()?;
        let target = options.target_branch().to_string();
        let mut behaviors = Vec::with_capacity(checkouts.len());
        for checkout in checkouts {
            let action = decide(tree, checkout, &options)?;
            debug!("{}: decided to {}", checkout, action);
            behaviors.push(BranchingBehavior::new(
                checkout.clone(),
                target.clone(),
                action,
                options.pretend,
            ));
        }
        behaviors.sort_by(|a, b| a.execution_order(b));
        Ok(Self { options, behaviors })
    }

    pub fn options(&self) -> &BranchingOptions {
        &self.options
    }

    /// In execution order.
    pub fn behaviors(&self) -> &[BranchingBehavior] {
        &self.behaviors
    }

    /// True if nothing in the batch would change anything.
    pub fn is_noop(&self) -> bool {
        self.behaviors
            .iter()
            .all(|b| b.action == BranchingAction::DoNothing)
    }

    /// Checks the whole batch, reporting every problem at once.
    pub fn validate(&self, tree: &ProjectTree) -> Result<()> {
        let mut problems = Vec::new();
        for behavior in &self.behaviors {
            behavior.validate(tree, &self.options, &mut problems)?;
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Preconditions { problems })
        }
    }

    /// Validates, then runs every action and post-action.
    pub fn execute(&self, tree: &ProjectTree) -> Result<TaskReport> {
        self.validate(tree)?;

        let mut run = TaskList::new("run");
        for behavior in &self.behaviors {
            if behavior.action == BranchingAction::DoNothing
                && !behavior.checkout.is_submodule_root()
            {
                continue;
            }
            run.add(
                format!("{}: {}", behavior.checkout, behavior.action),
                move || behavior.run(tree),
            );
        }

        let submodule_paths: Vec<PathBuf> = self
            .behaviors
            .iter()
            .filter(|b| !b.checkout.is_submodule_root())
            .map(|b| b.checkout.relative_path().to_path_buf())
            .collect();
        let submodule_paths = &submodule_paths;

        let mut post_run = TaskList::new("post-run");
        if self.options.update_root {
            for behavior in self.behaviors.iter().rev() {
                let name = if behavior.checkout.is_submodule_root() {
                    format!("{}: commit submodule changes", behavior.checkout)
                } else if behavior.action.changes_branch() {
                    format!("{}: record branch in .gitmodules", behavior.checkout)
                } else {
                    continue;
                };
                let options = &self.options;
                post_run.add(name, move || {
                    behavior.post_run(tree, options, submodule_paths)
                });
            }
        }

        let mut tasks = TaskList::new(format!("checkout {}", self.options.target_branch()));
        tasks.group(run).group(post_run);
        let report = tasks.run(self.options.pretend)?;
        tree.invalidate_all();
        Ok(report)
    }
}
