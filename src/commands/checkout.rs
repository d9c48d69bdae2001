//! # Checkout Command Implementation
//!
//! This module implements the `checkout` subcommand, which moves every
//! checkout in scope onto a common branch.
//!
//! ## Functionality
//!
//! - **Branch Sync**: Without `--target-branch`, gets everyone onto the base
//!   branch (pulling where behind). With it, switches to or creates the
//!   target branch in every checkout.
//! - **Safety**: The whole batch is validated before anything changes. Any
//!   problem in any checkout (a missing base branch, local changes that
//!   would be left behind) aborts the command with every problem listed.
//! - **Root Update**: Afterwards the submodule root's `.gitmodules` records
//!   each child's branch and the root is committed.
//! - **Pretend Mode**: `--pretend` decides and validates everything and
//!   reports what would run, without changing anything.

use anyhow::Result;
use clap::{ArgAction, Args};

use cactus::branch::validate_branch_name;
use cactus::branching::{
    BranchOverride, BranchingBatch, BranchingOptions, Target, DEFAULT_COMMIT_MESSAGE,
};
use cactus::error::Error;

use super::{print_report, OutputFormat, ScopeArgs, Session};
use crate::cli::GlobalArgs;

/// Move checkouts onto a common branch
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Branch to move to. Without it, checkouts move to the base branch.
    #[arg(long, value_name = "BRANCH")]
    pub target_branch: Option<String>,

    /// Branch new branches start from. Defaults to the configured base
    /// branch, or `develop`.
    #[arg(long, value_name = "BRANCH")]
    pub base_branch: Option<String>,

    /// Create the target branch where it does not exist.
    #[arg(long)]
    pub create_branches: bool,

    /// Create local branches for branches that only exist remotely.
    #[arg(long)]
    pub create_local_branches: bool,

    /// Push newly created branches.
    #[arg(long)]
    pub push: bool,

    /// Allow branch creation in checkouts with uncommitted changes.
    #[arg(long)]
    pub permit_local_changes: bool,

    /// Fetch before deciding.
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub fetch_first: bool,

    /// Submodule that goes to a different ref than the others.
    #[arg(long, value_name = "SUBMODULE", requires = "override_branch_with")]
    pub override_branch_in: Option<String>,

    /// Branch or commit for the --override-branch-in submodule.
    #[arg(long, value_name = "REF", requires = "override_branch_in")]
    pub override_branch_with: Option<String>,

    /// Record new branches in the root's .gitmodules and commit the root.
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub update_root: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Report what would happen without changing anything.
    #[arg(long)]
    pub pretend: bool,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl CheckoutArgs {
    /// Checks the names given on the command line. Runs before discovery,
    /// so a typo is reported without touching git.
    fn validate(&self) -> cactus::error::Result<()> {
        let names = [
            &self.target_branch,
            &self.base_branch,
            &self.override_branch_with,
        ];
        for name in names.into_iter().flatten() {
            validate_branch_name(name)?;
        }
        if let Some(submodule) = &self.override_branch_in {
            if submodule.trim().is_empty() {
                return Err(Error::config("the override submodule is empty"));
            }
        }
        Ok(())
    }

    fn options(&self, session: &Session) -> BranchingOptions {
        let base_branch = self
            .base_branch
            .clone()
            .unwrap_or_else(|| session.config.base_branch().to_string());
        let branch_override = match (&self.override_branch_in, &self.override_branch_with) {
            (Some(submodule), Some(reference)) => Some(BranchOverride {
                submodule: submodule.clone(),
                reference: reference.clone(),
            }),
            _ => None,
        };
        BranchingOptions {
            target: Target::from_option(self.target_branch.clone()),
            base_branch,
            create_branches: self.create_branches,
            create_local_branches: self.create_local_branches,
            permit_local_changes: self.permit_local_changes,
            push: self.push,
            update_root: self.update_root,
            pretend: self.pretend,
            branch_override,
            commit_message: session
                .config
                .commit_message
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
        }
    }
}

/// Execute the `checkout` command.
pub fn execute(args: CheckoutArgs, global: &GlobalArgs) -> Result<()> {
    args.validate()?;
    let session = Session::open(global)?;
    let options = args.options(&session);
    options.validate()?;

    let checkouts = session.scoped(&args.scope)?;
    if checkouts.is_empty() {
        println!("No checkouts in scope; nothing to do");
        return Ok(());
    }
    if args.fetch_first {
        session.fetch(&checkouts)?;
    }

    let batch = BranchingBatch::plan(&session.tree, &checkouts, options)?;
    let report = batch.execute(&session.tree)?;

    print_report(
        args.format,
        &report,
        &serde_json::json!({ "decisions": batch.behaviors(), "report": &report }),
    )
}
