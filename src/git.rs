//! Thin wrappers around the system `git` command.
//!
//! Every function runs one git invocation in a working directory and maps
//! failures to [`Error::GitCommand`]. Using the system binary means SSH
//! keys, credential helpers and everything else in the user's git
//! configuration apply unchanged.
//!
//! Commands whose exit code *is* the answer (`diff --quiet`,
//! `merge-base --is-ancestor`) treat 0 and 1 as results and anything else as
//! a failure.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, trace};

use crate::branch::{Branches, PREFERRED_REMOTE};
use crate::error::{Error, Result};

/// Captured result of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs `git <args>` in `dir` without interpreting the exit status.
pub fn run_git(dir: &Path, args: &[&str]) -> Result<GitOutput> {
    trace!("git {} (in {})", args.join(" "), dir.display());
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|e| Error::GitCommand {
            command: args.join(" "),
            dir: dir.to_path_buf(),
            stderr: e.to_string(),
        })?;

    Ok(GitOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code(),
    })
}

/// Runs `git <args>` in `dir`, failing on a non-zero exit, and returns stdout.
fn run_checked(dir: &Path, args: &[&str]) -> Result<String> {
    let output = run_git(dir, args)?;
    if !output.success() {
        return Err(command_failed(dir, args, &output));
    }
    Ok(output.stdout)
}

/// Runs a command whose exit code 0/1 is a yes/no answer.
fn run_predicate(dir: &Path, args: &[&str]) -> Result<bool> {
    let output = run_git(dir, args)?;
    match output.code {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => Err(command_failed(dir, args, &output)),
    }
}

fn command_failed(dir: &Path, args: &[&str], output: &GitOutput) -> Error {
    let stderr = output.stderr.trim();
    Error::GitCommand {
        command: args.join(" "),
        dir: dir.to_path_buf(),
        stderr: if stderr.is_empty() {
            format!("exited with {:?}", output.code)
        } else {
            stderr.to_string()
        },
    }
}

/// All local and remote branches, with the current branch marked.
pub fn branches(dir: &Path) -> Result<Branches> {
    let stdout = run_checked(dir, &["branch", "--no-color", "-a"])?;
    Branches::parse(&stdout)
}

/// True if `git status --porcelain` reports anything, including untracked
/// files.
pub fn has_local_changes(dir: &Path) -> Result<bool> {
    let stdout = run_checked(dir, &["status", "--porcelain"])?;
    Ok(!stdout.trim().is_empty())
}

/// True if the working tree differs from the index (`git diff --quiet`).
///
/// This also reports submodules with "modified content", which may leave
/// nothing to stage; callers that commit check [`has_staged_changes`] after
/// adding.
pub fn is_dirty(dir: &Path) -> Result<bool> {
    run_predicate(dir, &["diff", "--quiet"]).map(|clean| !clean)
}

/// True if the index differs from HEAD.
pub fn has_staged_changes(dir: &Path) -> Result<bool> {
    run_predicate(dir, &["diff", "--cached", "--quiet"]).map(|clean| !clean)
}

pub fn is_detached(dir: &Path) -> Result<bool> {
    let stdout = run_checked(dir, &["status", "--porcelain=2", "--branch"])?;
    Ok(detached_from_porcelain_v2(&stdout))
}

/// Reads the `# branch.head` header of `status --porcelain=2 --branch`.
pub fn detached_from_porcelain_v2(status: &str) -> bool {
    status
        .lines()
        .filter_map(|line| line.strip_prefix("# branch.head "))
        .any(|head| head.trim() == "(detached)")
}

/// Commit id `reference` resolves to, or `None` if it does not exist.
pub fn head_of(dir: &Path, reference: &str) -> Result<Option<String>> {
    let spec = format!("{}^{{commit}}", reference);
    let output = run_git(dir, &["rev-parse", "--verify", "--quiet", &spec])?;
    match output.code {
        Some(0) => Ok(Some(output.stdout.trim().to_string())),
        Some(1) => Ok(None),
        _ => Err(command_failed(dir, &["rev-parse", "--verify", &spec], &output)),
    }
}

/// `git merge-base --is-ancestor`: is every commit of `ancestor` contained
/// in `descendant`?
pub fn is_ancestor(dir: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
    run_predicate(dir, &["merge-base", "--is-ancestor", ancestor, descendant])
}

/// Number of commits reachable from `to` but not from `from`.
pub fn commits_between(dir: &Path, from: &str, to: &str) -> Result<usize> {
    let range = format!("{}..{}", from, to);
    let stdout = run_checked(dir, &["rev-list", "--count", &range])?;
    stdout.trim().parse().map_err(|_| Error::GitCommand {
        command: format!("rev-list --count {}", range),
        dir: dir.to_path_buf(),
        stderr: format!("unexpected output '{}'", stdout.trim()),
    })
}

pub fn fetch_all(dir: &Path) -> Result<()> {
    debug!("Fetching all remotes in {}", dir.display());
    run_checked(dir, &["fetch", "--all", "--prune"]).map(|_| ())
}

pub fn pull(dir: &Path) -> Result<()> {
    run_checked(dir, &["pull"]).map(|_| ())
}

/// Pushes a branch that has no upstream yet and records the upstream.
pub fn push_new_branch(dir: &Path, remote: &str, branch: &str) -> Result<()> {
    run_checked(dir, &["push", "-u", remote, branch]).map(|_| ())
}

/// `git checkout -b <name> [<start_point>]`. A remote start point makes the
/// new branch track it.
pub fn create_branch(dir: &Path, name: &str, start_point: Option<&str>) -> Result<()> {
    let mut args = vec!["checkout", "-b", name];
    if let Some(start) = start_point {
        args.push(start);
    }
    run_checked(dir, &args).map(|_| ())
}

/// `git checkout <reference>`; the reference may be a branch or a commit id.
pub fn switch_to(dir: &Path, reference: &str) -> Result<()> {
    run_checked(dir, &["checkout", reference]).map(|_| ())
}

/// `git add -- <paths>`; paths are relative to `dir`.
pub fn add_paths(dir: &Path, paths: &[&Path]) -> Result<()> {
    let mut args = vec!["add".to_string(), "--".to_string()];
    args.extend(paths.iter().map(|p| p.display().to_string()));
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_checked(dir, &args).map(|_| ())
}

/// `git config --file <file> <key> <value>`. Git edits the one entry in
/// place, so the rest of the file keeps its layout and comments.
pub fn set_config_in_file(dir: &Path, file: &Path, key: &str, value: &str) -> Result<()> {
    let file = file.display().to_string();
    run_checked(dir, &["config", "--file", &file, key, value]).map(|_| ())
}

pub fn commit(dir: &Path, message: &str) -> Result<()> {
    run_checked(dir, &["commit", "-m", message]).map(|_| ())
}

pub fn remotes(dir: &Path) -> Result<Vec<String>> {
    let stdout = run_checked(dir, &["remote"])?;
    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// The remote this checkout pushes to: the upstream of the current branch if
/// there is one, else `origin`, else the first configured remote.
pub fn default_remote(dir: &Path) -> Result<Option<String>> {
    let upstream = run_git(
        dir,
        &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
    )?;
    if upstream.success() {
        if let Some(remote) = remote_of_upstream(upstream.stdout.trim()) {
            return Ok(Some(remote));
        }
    }
    let remotes = remotes(dir)?;
    if remotes.iter().any(|r| r == PREFERRED_REMOTE) {
        return Ok(Some(PREFERRED_REMOTE.to_string()));
    }
    Ok(remotes.into_iter().next())
}

/// `origin/feature/x` → `origin`.
pub fn remote_of_upstream(upstream: &str) -> Option<String> {
    upstream
        .split_once('/')
        .map(|(remote, _)| remote.to_string())
        .filter(|r| !r.is_empty())
}

pub fn tag(dir: &Path, name: &str, commit: &str) -> Result<()> {
    run_checked(dir, &["tag", name, commit]).map(|_| ())
}

pub fn push_tag(dir: &Path, remote: &str, tag: &str) -> Result<()> {
    let refspec = format!("refs/tags/{}", tag);
    run_checked(dir, &["push", remote, &refspec]).map(|_| ())
}

pub fn delete_local_branch(dir: &Path, name: &str) -> Result<()> {
    run_checked(dir, &["branch", "-D", name]).map(|_| ())
}

pub fn delete_remote_branch(dir: &Path, remote: &str, name: &str) -> Result<()> {
    run_checked(dir, &["push", remote, "--delete", name]).map(|_| ())
}

/// Root of the working copy containing `dir`.
pub fn toplevel(dir: &Path) -> Result<PathBuf> {
    let output = run_git(dir, &["rev-parse", "--show-toplevel"])?;
    if !output.success() {
        return Err(Error::NotARepository {
            path: dir.to_path_buf(),
        });
    }
    Ok(PathBuf::from(output.stdout.trim()))
}

/// Root of the superproject if the working copy at `dir` is a submodule.
pub fn superproject(dir: &Path) -> Result<Option<PathBuf>> {
    let stdout = run_checked(dir, &["rev-parse", "--show-superproject-working-tree"])?;
    let path = stdout.trim();
    if path.is_empty() {
        Ok(None)
    } else {
        Ok(Some(PathBuf::from(path)))
    }
}
