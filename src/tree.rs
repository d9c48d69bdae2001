//! # Project Tree
//!
//! The in-memory graph of every checkout reachable from a submodule root,
//! plus a per-checkout cache of the git state the decision engines query
//! repeatedly.
//!
//! ## Discovery
//!
//! Starting from any directory, discovery walks *up* to the enclosing
//! working copy and then through its superprojects to the top, and then
//! *down* through the top's `.gitmodules` to every initialized submodule.
//! The group ids of the Maven projects inside each checkout are read once,
//! during discovery.
//!
//! ## Caching
//!
//! Branch listings and local-change flags are cached per checkout. Anything
//! that mutates a checkout must call [`ProjectTree::invalidate`] (or
//! [`ProjectTree::invalidate_all`]) afterwards.
//!
//! The cache uses `RefCell` and no locking: a tree is owned by one
//! operation on one thread, and batches are executed sequentially.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use log::debug;

use crate::branch::Branches;
use crate::checkout::Checkout;
use crate::error::Result;
use crate::repository::{DefaultGitOperations, GitOperations};
use crate::{git, gitmodules, maven};

static NO_GROUP_IDS: BTreeSet<String> = BTreeSet::new();

/// All checkouts of one submodule tree.
pub struct ProjectTree {
    git_ops: Box<dyn GitOperations>,
    root: Checkout,
    /// Sorted by path; includes the root.
    checkouts: Vec<Checkout>,
    group_ids: BTreeMap<Checkout, BTreeSet<String>>,
    branch_cache: RefCell<HashMap<PathBuf, Branches>>,
    local_changes_cache: RefCell<HashMap<PathBuf, bool>>,
}

impl ProjectTree {
    /// Discovers the tree containing `start` using the system git.
    pub fn discover(start: &Path) -> Result<Self> {
        Self::discover_with(start, Box::new(DefaultGitOperations))
    }

    /// Discovers the tree containing `start`; later queries go through
    /// `git_ops`.
    pub fn discover_with(start: &Path, git_ops: Box<dyn GitOperations>) -> Result<Self> {
        let start = start.canonicalize()?;
        let mut top = git::toplevel(&start)?;
        while let Some(superproject) = git::superproject(&top)? {
            top = superproject;
        }
        let top = top.canonicalize()?;

        let root = Checkout::root(&top, gitmodules::exists(&top));
        let mut checkouts = vec![root.clone()];
        for submodule in gitmodules::read(&top)? {
            let checkout = Checkout::submodule(&top, &submodule.path);
            if checkout.path().join(".git").exists() {
                checkouts.push(checkout);
            } else {
                debug!("Submodule {} is not initialized; skipping", submodule.name);
            }
        }

        let mut group_ids = BTreeMap::new();
        for checkout in &checkouts {
            group_ids.insert(checkout.clone(), maven::group_ids_in(checkout.path())?);
        }

        debug!(
            "Discovered {} checkout(s) under {}",
            checkouts.len(),
            top.display()
        );
        Ok(Self::with_checkouts(git_ops, root, checkouts, group_ids))
    }

    /// Builds a tree from already known checkouts.
    pub fn with_checkouts(
        git_ops: Box<dyn GitOperations>,
        root: Checkout,
        checkouts: Vec<Checkout>,
        group_ids: BTreeMap<Checkout, BTreeSet<String>>,
    ) -> Self {
        let mut checkouts = checkouts;
        if !checkouts.contains(&root) {
            checkouts.push(root.clone());
        }
        checkouts.sort();
        checkouts.dedup();
        Self {
            git_ops,
            root,
            checkouts,
            group_ids,
            branch_cache: RefCell::new(HashMap::new()),
            local_changes_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn git(&self) -> &dyn GitOperations {
        self.git_ops.as_ref()
    }

    /// The top-level checkout.
    pub fn root(&self) -> &Checkout {
        &self.root
    }

    /// The top-level checkout if it declares submodules.
    pub fn submodule_root(&self) -> Option<&Checkout> {
        Some(&self.root).filter(|root| root.is_submodule_root())
    }

    pub fn checkouts(&self) -> &[Checkout] {
        &self.checkouts
    }

    /// The innermost checkout containing `dir`.
    pub fn checkout_containing(&self, dir: &Path) -> Option<&Checkout> {
        self.checkouts
            .iter()
            .filter(|c| c.contains(dir))
            .max_by_key(|c| c.path().components().count())
    }

    pub fn group_ids(&self, checkout: &Checkout) -> &BTreeSet<String> {
        self.group_ids.get(checkout).unwrap_or(&NO_GROUP_IDS)
    }

    /// Cached branch snapshot of `checkout`.
    pub fn branches(&self, checkout: &Checkout) -> Result<Branches> {
        if let Some(branches) = self.branch_cache.borrow().get(checkout.path()) {
            return Ok(branches.clone());
        }
        let branches = self.git_ops.branches(checkout.path())?;
        self.branch_cache
            .borrow_mut()
            .insert(checkout.path().to_path_buf(), branches.clone());
        Ok(branches)
    }

    /// Cached: does `checkout` have uncommitted changes of any kind?
    pub fn has_local_changes(&self, checkout: &Checkout) -> Result<bool> {
        if let Some(changes) = self.local_changes_cache.borrow().get(checkout.path()) {
            return Ok(*changes);
        }
        let changes = self.git_ops.has_local_changes(checkout.path())?;
        self.local_changes_cache
            .borrow_mut()
            .insert(checkout.path().to_path_buf(), changes);
        Ok(changes)
    }

    /// Uncached `git diff --quiet` test.
    pub fn is_dirty(&self, checkout: &Checkout) -> Result<bool> {
        self.git_ops.is_dirty(checkout.path())
    }

    /// Drops everything cached about `checkout`.
    pub fn invalidate(&self, checkout: &Checkout) {
        self.branch_cache.borrow_mut().remove(checkout.path());
        self.local_changes_cache
            .borrow_mut()
            .remove(checkout.path());
    }

    pub fn invalidate_all(&self) {
        self.branch_cache.borrow_mut().clear();
        self.local_changes_cache.borrow_mut().clear();
    }

    /// Fetches every remote of each checkout and drops their caches, so
    /// decisions about remote branches use current knowledge.
    pub fn fetch(&self, checkouts: &[Checkout]) -> Result<()> {
        for checkout in checkouts {
            self.git_ops.fetch_all(checkout.path())?;
            self.invalidate(checkout);
        }
        Ok(())
    }
}
