//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `cactus` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` (and the global
//!   options) and calls into the `cactus` library to do the work.
//!
//! Commands that work on a submodule tree start from a [`Session`]: the
//! discovered tree, the merged configuration, and the checkout the command
//! was run from.

pub mod automerge_tag;
pub mod branch_cleanup;
pub mod check;
pub mod checkout;
pub mod completions;
pub mod tree;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use cactus::checkout::Checkout;
use cactus::config::{self, Config};
use cactus::output::{self, OutputConfig};
use cactus::scope::{ProjectFamily, Scope};
use cactus::tasks::TaskReport;
use cactus::tree::ProjectTree;

use crate::cli::GlobalArgs;

/// Options selecting which checkouts a command works on.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Which checkouts to operate on. Defaults to the configured scope, or
    /// `family`.
    #[arg(long, value_enum, value_name = "SCOPE")]
    pub scope: Option<Scope>,

    /// Include the submodule root.
    #[arg(long)]
    pub include_root: bool,

    /// Project family for family scopes. Defaults to the family of the
    /// project in the current directory.
    #[arg(long, value_name = "FAMILY")]
    pub family: Option<String>,

    /// Group id for the same-group-id scope. Defaults to that of the project
    /// in the current directory.
    #[arg(long, value_name = "GROUP_ID")]
    pub group_id: Option<String>,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Indented, human-readable text
    #[default]
    Text,
    /// JSON on stdout
    Json,
}

/// Everything a tree command needs.
pub struct Session {
    pub output: OutputConfig,
    pub config: Config,
    pub tree: ProjectTree,
    /// The checkout containing the working directory.
    pub calling: Checkout,
}

impl Session {
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let output = OutputConfig::from_env_and_flag(&global.color);
        let dir = match &global.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };
        let tree = ProjectTree::discover(&dir)
            .with_context(|| format!("Failed to find a git checkout at {}", dir.display()))?;
        let config = config::load(global.config.as_deref(), tree.root().path())?;

        let dir: PathBuf = dir.canonicalize()?;
        let calling = tree
            .checkout_containing(&dir)
            .cloned()
            .unwrap_or_else(|| tree.root().clone());

        Ok(Self {
            output,
            config,
            tree,
            calling,
        })
    }

    /// The checkouts selected by `args`, deepest first.
    pub fn scoped(&self, args: &ScopeArgs) -> Result<Vec<Checkout>> {
        let scope = args.scope.or(self.config.scope).unwrap_or_default();
        let family = args.family.as_deref().map(ProjectFamily::new);
        let checkouts = scope.match_checkouts(
            &self.tree,
            &self.calling,
            args.include_root,
            family.as_ref(),
            args.group_id.as_deref(),
        )?;
        Ok(checkouts)
    }

    /// Fetches every remote of `checkouts` behind a spinner.
    pub fn fetch(&self, checkouts: &[Checkout]) -> Result<()> {
        let spinner = output::spinner(
            &self.output,
            format!("Fetching {} checkout(s)", checkouts.len()),
        );
        let result = self.tree.fetch(checkouts);
        spinner.finish_and_clear();
        Ok(result?)
    }
}

/// Prints `report` as text, or `json` when JSON was asked for.
pub fn print_report<T: Serialize>(
    format: OutputFormat,
    report: &TaskReport,
    json: &T,
) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(json)?),
    }
    Ok(())
}
