//! # Check Command Implementation
//!
//! This module implements the `check` subcommand, which verifies that the
//! checkouts in scope are consistent with each other: all attached to the
//! same branch, free of uncommitted changes, and recorded with that branch
//! in the submodule root's `.gitmodules`.
//!
//! This command is a safe, read-only operation. It exits non-zero listing
//! every problem found.

use anyhow::Result;
use clap::Args;

use cactus::consistency::{self, ConsistencyOptions};
use cactus::output::emoji;

use super::{ScopeArgs, Session};
use crate::cli::GlobalArgs;

/// Check that checkouts are consistent with each other
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Do not report uncommitted changes.
    #[arg(long)]
    pub permit_local_changes: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    let checkouts = session.scoped(&args.scope)?;

    let options = ConsistencyOptions {
        permit_local_changes: args.permit_local_changes,
    };
    consistency::ensure_consistent(&session.tree, &checkouts, options)?;

    println!(
        "{} {} checkout(s) consistent",
        emoji(&session.output, "✅", "OK:"),
        checkouts.len()
    );
    Ok(())
}
