//! In-memory git model shared by unit tests.
//!
//! `MockGit` implements [`GitOperations`] over a map of fake checkouts. Each
//! fake checkout has local and remote branches pointing at symbolic commit
//! ids, a current branch, change flags and an explicit ancestry relation.
//! Mutating operations update that state and are recorded in call order so
//! tests can assert what ran, and in which sequence.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::branch::{Branch, Branches};
use crate::error::{Error, Result};
use crate::repository::GitOperations;

/// State of one fake checkout.
#[derive(Debug, Clone, Default)]
pub struct MockRepo {
    pub local: BTreeMap<String, String>,
    pub remote: BTreeMap<(String, String), String>,
    pub current: Option<String>,
    pub detached_head: Option<String>,
    pub local_changes: bool,
    pub dirty: bool,
    pub staged: bool,
    /// (ancestor, descendant) commit pairs, in addition to identity.
    pub ancestry: BTreeSet<(String, String)>,
    /// Local branch name → commits its remote is ahead by.
    pub behind: BTreeMap<String, usize>,
    /// Local branch name → commits not yet on its remote.
    pub ahead: BTreeMap<String, usize>,
    pub default_remote: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub gitmodules: BTreeMap<PathBuf, String>,
    pub commits: Vec<String>,
    /// Operation names that fail in this checkout.
    pub failing: BTreeSet<String>,
}

pub fn commit_of(branch: &str) -> String {
    format!("c-{}", branch)
}

impl MockRepo {
    /// A checkout on local branch `branch`, with an `origin` remote configured.
    pub fn on(branch: &str) -> Self {
        Self::default()
            .with_local(branch)
            .checked_out(branch)
            .with_default_remote("origin")
    }

    /// A checkout with HEAD detached at `commit`.
    pub fn detached(commit: &str) -> Self {
        Self {
            detached_head: Some(commit.to_string()),
            default_remote: Some("origin".to_string()),
            ..Self::default()
        }
    }

    pub fn checked_out(mut self, branch: &str) -> Self {
        self.current = Some(branch.to_string());
        self.detached_head = None;
        self
    }

    pub fn with_local(self, name: &str) -> Self {
        self.with_local_head(name, &commit_of(name))
    }

    pub fn with_local_head(mut self, name: &str, commit: &str) -> Self {
        self.local.insert(name.to_string(), commit.to_string());
        self
    }

    /// `origin/<name>` at the same commit a local branch of that name would
    /// have, so a local copy is up to date.
    pub fn with_remote(self, name: &str) -> Self {
        self.with_remote_head("origin", name, &commit_of(name))
    }

    pub fn with_remote_head(mut self, remote: &str, name: &str, commit: &str) -> Self {
        self.remote
            .insert((remote.to_string(), name.to_string()), commit.to_string());
        self
    }

    /// The local branch `name` is `commits` behind its remote.
    pub fn behind(mut self, name: &str, commits: usize) -> Self {
        self.behind.insert(name.to_string(), commits);
        self
    }

    /// The local branch `name` has `commits` unpushed commits.
    pub fn ahead(mut self, name: &str, commits: usize) -> Self {
        self.ahead.insert(name.to_string(), commits);
        self
    }

    pub fn with_local_changes(mut self) -> Self {
        self.local_changes = true;
        self.dirty = true;
        self
    }

    /// Records that `descendant` contains `ancestor`.
    pub fn containing(mut self, ancestor: &str, descendant: &str) -> Self {
        self.ancestry
            .insert((ancestor.to_string(), descendant.to_string()));
        self
    }

    pub fn with_default_remote(mut self, remote: &str) -> Self {
        self.default_remote = Some(remote.to_string());
        self
    }

    pub fn without_remotes(mut self) -> Self {
        self.default_remote = None;
        self
    }

    pub fn with_gitmodule(mut self, path: &str, branch: &str) -> Self {
        self.gitmodules
            .insert(PathBuf::from(path), branch.to_string());
        self
    }

    pub fn failing(mut self, operation: &str) -> Self {
        self.failing.insert(operation.to_string());
        self
    }

    fn head(&self) -> Option<String> {
        match &self.current {
            Some(branch) => self.local.get(branch).cloned(),
            None => self.detached_head.clone(),
        }
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        if reference == "HEAD" {
            return self.head();
        }
        if let Some(commit) = self.local.get(reference) {
            return Some(commit.clone());
        }
        if let Some(tag) = reference.strip_prefix("refs/tags/") {
            return self.tags.get(tag).cloned();
        }
        if let Some((remote, name)) = reference.split_once('/') {
            if let Some(commit) = self.remote.get(&(remote.to_string(), name.to_string())) {
                return Some(commit.clone());
            }
        }
        let known = self
            .local
            .values()
            .chain(self.remote.values())
            .chain(self.detached_head.iter())
            .any(|c| c == reference);
        known.then(|| reference.to_string())
    }

    fn branches(&self) -> Result<Branches> {
        let mut branches: Vec<Branch> = self.local.keys().map(Branch::local).collect();
        branches.extend(
            self.remote
                .keys()
                .map(|(remote, name)| Branch::remote(remote.clone(), name.clone())),
        );
        Branches::new(branches, self.current.as_ref().map(Branch::local))
    }
}

/// One recorded mutating (or network) operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: String,
    pub dir: PathBuf,
    pub args: Vec<String>,
}

#[derive(Default)]
struct State {
    repos: BTreeMap<PathBuf, MockRepo>,
    calls: Vec<Call>,
    queries: Vec<(String, PathBuf)>,
}

/// Shared-handle fake git; clones observe the same state.
#[derive(Clone, Default)]
pub struct MockGit {
    state: Arc<Mutex<State>>,
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_repo(&self, dir: &Path, repo: MockRepo) {
        self.state
            .lock()
            .unwrap()
            .repos
            .insert(dir.to_path_buf(), repo);
    }

    pub fn repo(&self, dir: &Path) -> MockRepo {
        self.state.lock().unwrap().repos[dir].clone()
    }

    /// Every recorded operation, fetches included.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded operations that change a checkout or a remote.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation != "fetch_all")
            .collect()
    }

    pub fn mutations_in(&self, dir: &Path) -> Vec<Call> {
        self.mutations()
            .into_iter()
            .filter(|c| c.dir == dir)
            .collect()
    }

    pub fn query_count(&self, operation: &str, dir: &Path) -> usize {
        self.state
            .lock()
            .unwrap()
            .queries
            .iter()
            .filter(|(op, d)| op == operation && d == dir)
            .count()
    }

    fn query<T>(
        &self,
        operation: &str,
        dir: &Path,
        f: impl FnOnce(&MockRepo) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        state
            .queries
            .push((operation.to_string(), dir.to_path_buf()));
        let repo = state.repos.get(dir).ok_or_else(|| Error::NotARepository {
            path: dir.to_path_buf(),
        })?;
        f(repo)
    }

    fn mutate<T>(
        &self,
        operation: &str,
        dir: &Path,
        args: &[&str],
        f: impl FnOnce(&mut MockRepo) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            operation: operation.to_string(),
            dir: dir.to_path_buf(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        let repo = state.repos.get_mut(dir).ok_or_else(|| Error::NotARepository {
            path: dir.to_path_buf(),
        })?;
        if repo.failing.contains(operation) {
            return Err(failure(operation, dir, "injected failure"));
        }
        f(repo)
    }
}

fn failure(operation: &str, dir: &Path, stderr: &str) -> Error {
    Error::GitCommand {
        command: operation.to_string(),
        dir: dir.to_path_buf(),
        stderr: stderr.to_string(),
    }
}

impl GitOperations for MockGit {
    fn branches(&self, dir: &Path) -> Result<Branches> {
        self.query("branches", dir, |r| r.branches())
    }

    fn has_local_changes(&self, dir: &Path) -> Result<bool> {
        self.query("has_local_changes", dir, |r| Ok(r.local_changes))
    }

    fn is_dirty(&self, dir: &Path) -> Result<bool> {
        self.query("is_dirty", dir, |r| Ok(r.dirty))
    }

    fn has_staged_changes(&self, dir: &Path) -> Result<bool> {
        self.query("has_staged_changes", dir, |r| Ok(r.staged))
    }

    fn is_detached(&self, dir: &Path) -> Result<bool> {
        self.query("is_detached", dir, |r| Ok(r.current.is_none()))
    }

    fn head_of(&self, dir: &Path, reference: &str) -> Result<Option<String>> {
        self.query("head_of", dir, |r| Ok(r.resolve(reference)))
    }

    fn is_ancestor(&self, dir: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
        self.query("is_ancestor", dir, |r| {
            let (Some(a), Some(d)) = (r.resolve(ancestor), r.resolve(descendant)) else {
                return Err(failure("merge-base", dir, "unknown revision"));
            };
            Ok(a == d || r.ancestry.contains(&(a, d)))
        })
    }

    fn commits_between(&self, dir: &Path, from: &str, to: &str) -> Result<usize> {
        self.query("commits_between", dir, |r| {
            let counted = r.local.keys().find_map(|name| {
                let remote = format!("origin/{}", name);
                if from == name && to == remote {
                    Some(r.behind.get(name).copied().unwrap_or(0))
                } else if from == remote && to == name {
                    Some(r.ahead.get(name).copied().unwrap_or(0))
                } else {
                    None
                }
            });
            Ok(counted.unwrap_or(0))
        })
    }

    fn default_remote(&self, dir: &Path) -> Result<Option<String>> {
        self.query("default_remote", dir, |r| Ok(r.default_remote.clone()))
    }

    fn fetch_all(&self, dir: &Path) -> Result<()> {
        self.mutate("fetch_all", dir, &[], |_| Ok(()))
    }

    fn pull(&self, dir: &Path) -> Result<()> {
        self.mutate("pull", dir, &[], |r| {
            let Some(branch) = r.current.clone() else {
                return Err(failure("pull", dir, "not on a branch"));
            };
            r.behind.remove(&branch);
            if let Some(commit) = r.remote.get(&("origin".to_string(), branch.clone())).cloned() {
                r.local.insert(branch, commit);
            }
            Ok(())
        })
    }

    fn push_new_branch(&self, dir: &Path, remote: &str, branch: &str) -> Result<()> {
        self.mutate("push_new_branch", dir, &[remote, branch], |r| {
            let commit = r
                .local
                .get(branch)
                .cloned()
                .ok_or_else(|| failure("push", dir, "src refspec does not match any"))?;
            r.remote
                .insert((remote.to_string(), branch.to_string()), commit);
            Ok(())
        })
    }

    fn create_branch(&self, dir: &Path, name: &str, start_point: Option<&str>) -> Result<()> {
        let args: Vec<&str> = std::iter::once(name).chain(start_point).collect();
        self.mutate("create_branch", dir, &args, |r| {
            if r.local.contains_key(name) {
                return Err(failure("checkout -b", dir, "branch already exists"));
            }
            let commit = match start_point {
                Some(start) => r.resolve(start),
                None => r.head(),
            }
            .ok_or_else(|| failure("checkout -b", dir, "invalid start point"))?;
            r.local.insert(name.to_string(), commit);
            r.current = Some(name.to_string());
            r.detached_head = None;
            Ok(())
        })
    }

    fn switch_to(&self, dir: &Path, reference: &str) -> Result<()> {
        self.mutate("switch_to", dir, &[reference], |r| {
            if r.local.contains_key(reference) {
                r.current = Some(reference.to_string());
                r.detached_head = None;
                return Ok(());
            }
            match r.resolve(reference) {
                Some(commit) => {
                    r.current = None;
                    r.detached_head = Some(commit);
                    Ok(())
                }
                None => Err(failure(
                    "checkout",
                    dir,
                    &format!("pathspec '{}' did not match", reference),
                )),
            }
        })
    }

    /// Stages the tracked changes; untracked files are never named.
    fn add_paths(&self, dir: &Path, paths: &[&Path]) -> Result<()> {
        let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let args: Vec<&str> = paths.iter().map(String::as_str).collect();
        self.mutate("add_paths", dir, &args, |r| {
            if r.dirty {
                r.staged = true;
            }
            Ok(())
        })
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<()> {
        self.mutate("commit", dir, &[message], |r| {
            if !r.staged {
                return Err(failure("commit", dir, "nothing to commit"));
            }
            r.staged = false;
            r.dirty = false;
            r.local_changes = false;
            r.commits.push(message.to_string());
            if let Some(branch) = r.current.clone() {
                let commit = format!("c-{}-{}", branch, r.commits.len());
                r.local.insert(branch, commit);
            }
            Ok(())
        })
    }

    fn tag(&self, dir: &Path, name: &str, commit: &str) -> Result<()> {
        self.mutate("tag", dir, &[name, commit], |r| {
            if r.tags.contains_key(name) {
                return Err(failure("tag", dir, "tag already exists"));
            }
            r.tags.insert(name.to_string(), commit.to_string());
            Ok(())
        })
    }

    fn push_tag(&self, dir: &Path, remote: &str, tag: &str) -> Result<()> {
        self.mutate("push_tag", dir, &[remote, tag], |_| Ok(()))
    }

    fn delete_local_branch(&self, dir: &Path, name: &str) -> Result<()> {
        self.mutate("delete_local_branch", dir, &[name], |r| {
            r.local
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| failure("branch -D", dir, "branch not found"))
        })
    }

    fn delete_remote_branch(&self, dir: &Path, remote: &str, name: &str) -> Result<()> {
        self.mutate("delete_remote_branch", dir, &[remote, name], |r| {
            r.remote
                .remove(&(remote.to_string(), name.to_string()))
                .map(|_| ())
                .ok_or_else(|| failure("push --delete", dir, "remote ref does not exist"))
        })
    }

    fn set_submodule_branch(
        &self,
        root: &Path,
        submodule_path: &Path,
        branch: &str,
    ) -> Result<bool> {
        let path = submodule_path.to_string_lossy().into_owned();
        self.mutate("set_submodule_branch", root, &[&path, branch], |r| {
            let previous = r
                .gitmodules
                .insert(submodule_path.to_path_buf(), branch.to_string());
            let changed = previous.as_deref() != Some(branch);
            if changed {
                r.dirty = true;
                r.local_changes = true;
            }
            Ok(changed)
        })
    }

    fn submodule_branches(&self, root: &Path) -> Result<BTreeMap<PathBuf, String>> {
        self.query("submodule_branches", root, |r| Ok(r.gitmodules.clone()))
    }
}
