//! # Error Handling
//!
//! This module defines the centralized error type for `cactus`. It uses the
//! `thiserror` library to describe every failure mode the library can hit,
//! grouped the way operators experience them:
//!
//! - **Configuration errors** (`Config`, `InvalidBranchName`) are detected
//!   before any git I/O and always name the offending value.
//! - **Precondition failures** (`Preconditions`) are collected across a whole
//!   batch of checkouts so that every blocking repository is reported at
//!   once.
//! - **Execution failures** (`GitCommand`, `Io`) abort the running operation
//!   immediately. Nothing already done is rolled back.
//! - **Structural errors** (`NotARepository`, `InvalidBranches`) describe a
//!   checkout tree that cannot be worked with.
//!
//! Soft conditions (a remote branch that is already gone, a tag that cannot
//! be pushed) are not errors; they are logged as warnings by the engines.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for cactus operations
#[derive(Error, Debug)]
pub enum Error {
    /// An option or configuration file value is invalid.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A branch name does not satisfy git's ref-name rules.
    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// A git command exited unsuccessfully or could not be started.
    #[error("Git command failed in {}: git {command} - {stderr}", dir.display())]
    GitCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// A path that should be inside a git working copy is not.
    #[error("Not a git repository: {}", path.display())]
    NotARepository { path: PathBuf },

    /// A branch listing violated the `Branches` invariants.
    #[error("Inconsistent branch state: {message}")]
    InvalidBranches { message: String },

    /// One or more checkouts cannot be operated on. Every problem found in
    /// the batch is listed.
    #[error("{} problem(s) prevent this operation:\n{}", problems.len(), problems.iter().map(|p| format!("  - {}", p)).collect::<Vec<_>>().join("\n"))]
    Preconditions { problems: Vec<String> },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A `.gitmodules` read or parse error, wrapped from `ini::Error`.
    #[error("Gitmodules error: {0}")]
    Ini(#[from] ini::Error),
}

impl Error {
    /// Shorthand for a configuration error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
