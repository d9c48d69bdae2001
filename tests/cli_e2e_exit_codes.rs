//! End-to-end tests for CLI exit codes.
//!
//! - Exit code 0: Success
//! - Exit code 1: General error, including failed preconditions
//! - Exit code 2: Invalid command-line usage (handled by clap)

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

/// Exit code 0 is returned for --help.
#[test]
fn test_exit_code_help() {
    let mut cmd = cargo_bin_cmd!("cactus");

    cmd.arg("--help")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("checkout"))
        .stdout(predicate::str::contains("branch-cleanup"))
        .stdout(predicate::str::contains("automerge-tag"));
}

/// Exit code 0 is returned for --version.
#[test]
fn test_exit_code_version() {
    let mut cmd = cargo_bin_cmd!("cactus");

    cmd.arg("--version").assert().code(0);
}

/// Exit code 2 is returned for an unknown subcommand.
#[test]
fn test_exit_code_unknown_subcommand() {
    let mut cmd = cargo_bin_cmd!("cactus");

    cmd.arg("frobnicate").assert().code(2);
}

/// Exit code 2 is returned for an unknown scope.
#[test]
fn test_exit_code_invalid_scope() {
    let mut cmd = cargo_bin_cmd!("cactus");

    cmd.args(["check", "--scope", "galaxy"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

/// Exit code 2 is returned when only half of a branch override is given.
#[test]
fn test_exit_code_override_needs_both_halves() {
    let mut cmd = cargo_bin_cmd!("cactus");

    cmd.args(["checkout", "--override-branch-in", "kivakit"])
        .assert()
        .code(2);
}

/// Exit code 1 is returned outside of any git checkout.
#[test]
fn test_exit_code_not_a_repository() {
    let temp = assert_fs::TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("cactus");

    cmd.current_dir(temp.path())
        .env("GIT_CEILING_DIRECTORIES", temp.path())
        .arg("tree")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to find a git checkout"));
}

/// A malformed branch name is reported before looking for a checkout.
#[test]
fn test_exit_code_invalid_branch_name_before_discovery() {
    let temp = assert_fs::TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("cactus");

    cmd.current_dir(temp.path())
        .env("GIT_CEILING_DIRECTORIES", temp.path())
        .args(["checkout", "--target-branch", "feature..x"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid branch name 'feature..x'"))
        .stderr(predicate::str::contains("Failed to find a git checkout").not());
}
