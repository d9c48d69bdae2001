//! # Automerge Tag Command Implementation
//!
//! This module implements the `automerge-tag` subcommand. Every checkout in
//! scope that is on the target branch and has commits the remote stable
//! branch lacks gets an `automerge-...` tag, optionally pushed.

use anyhow::Result;
use clap::Args;

use cactus::automerge::{self, AutomergeOptions};

use super::{print_report, OutputFormat, ScopeArgs, Session};
use crate::cli::GlobalArgs;

/// Tag checkouts with work that is not yet in the stable branch
#[derive(Args, Debug)]
pub struct AutomergeTagArgs {
    /// Branch whose work should be promoted. Defaults to the base branch.
    #[arg(long, value_name = "BRANCH")]
    pub target_branch: Option<String>,

    /// Branch the work is promoted to. Defaults to the configured stable
    /// branch, or `stable`.
    #[arg(long, value_name = "BRANCH")]
    pub stable_branch: Option<String>,

    /// Push the tags.
    #[arg(long)]
    pub push: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Report what would be tagged without tagging.
    #[arg(long)]
    pub pretend: bool,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Execute the `automerge-tag` command.
pub fn execute(args: AutomergeTagArgs, global: &GlobalArgs) -> Result<()> {
    for name in [&args.target_branch, &args.stable_branch]
        .into_iter()
        .flatten()
    {
        cactus::branch::validate_branch_name(name)?;
    }
    let session = Session::open(global)?;
    let options = AutomergeOptions {
        target_branch: args
            .target_branch
            .clone()
            .unwrap_or_else(|| session.config.base_branch().to_string()),
        stable_branch: args
            .stable_branch
            .clone()
            .unwrap_or_else(|| session.config.stable_branch().to_string()),
        push: args.push,
        pretend: args.pretend,
    };
    cactus::branch::validate_branch_name(&options.target_branch)?;
    cactus::branch::validate_branch_name(&options.stable_branch)?;

    let checkouts = session.scoped(&args.scope)?;
    let candidates = automerge::plan(&session.tree, &checkouts, &options)?;
    if candidates.is_empty() && args.format == OutputFormat::Text {
        println!(
            "Nothing to tag: no checkout on {} has work missing from {}",
            options.target_branch, options.stable_branch
        );
        return Ok(());
    }
    let report = automerge::execute(&session.tree, &candidates, &options)?;

    print_report(
        args.format,
        &report,
        &serde_json::json!({ "candidates": &candidates, "report": &report }),
    )
}
