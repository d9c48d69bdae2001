//! # Branch Cleanup Command Implementation
//!
//! This module implements the `branch-cleanup` subcommand, which deletes
//! feature branches whose work already landed in a safe branch.
//!
//! Deletions are simulated unless `--i-understand-the-risks` is given. A
//! remote branch name with unmerged work in any checkout is kept in every
//! checkout.

use anyhow::Result;
use clap::{ArgAction, Args};

use cactus::cleanup::{self, CleanupPolicy};
use cactus::config::Config;

use super::{print_report, OutputFormat, ScopeArgs, Session};
use crate::cli::GlobalArgs;

/// Delete branches that were merged into a safe branch
#[derive(Args, Debug)]
pub struct BranchCleanupArgs {
    /// Extra branch names never to delete (comma separated).
    #[arg(long, value_name = "BRANCHES", value_delimiter = ',')]
    pub protected_branches: Vec<String>,

    /// Regular expressions for branch names never to delete.
    #[arg(long, value_name = "PATTERNS", value_delimiter = ',')]
    pub protected_branch_patterns: Vec<String>,

    /// Branches feature work is merged into. Defaults to the configured safe
    /// branches, or develop, release/current and publish.
    #[arg(long, value_name = "BRANCHES", value_delimiter = ',')]
    pub safe_branches: Vec<String>,

    /// Regular expressions for safe branch names.
    #[arg(long, value_name = "PATTERNS", value_delimiter = ',')]
    pub safe_branch_patterns: Vec<String>,

    /// Really delete branches. Without this, deletions are only reported.
    #[arg(long)]
    pub i_understand_the_risks: bool,

    /// Delete remote branches.
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub cleanup_remote: bool,

    /// Delete local branches that have no remote counterpart.
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub cleanup_local: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl BranchCleanupArgs {
    /// Command-line values added to (or, for safe branches, replacing) the
    /// configured ones.
    fn policy(&self, config: &Config) -> cactus::error::Result<CleanupPolicy> {
        let with_config = |args: &[String], configured: &Option<Vec<String>>| -> Vec<String> {
            args.iter()
                .chain(configured.iter().flatten())
                .cloned()
                .collect()
        };
        let safe_branches = if self.safe_branches.is_empty() {
            config.safe_branches()
        } else {
            self.safe_branches.clone()
        };
        let mut policy = CleanupPolicy::new(
            &with_config(&self.protected_branches, &config.protected_branches),
            &with_config(&self.protected_branch_patterns, &config.protected_branch_patterns),
            &safe_branches,
            &with_config(&self.safe_branch_patterns, &config.safe_branch_patterns),
        )?;
        policy.cleanup_remote = self.cleanup_remote;
        policy.cleanup_local = self.cleanup_local;
        policy.i_understand_the_risks = self.i_understand_the_risks;
        Ok(policy)
    }
}

/// Execute the `branch-cleanup` command.
pub fn execute(args: BranchCleanupArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    let policy = args.policy(&session.config)?;

    let checkouts = session.scoped(&args.scope)?;
    let plan = cleanup::plan(&session.tree, &checkouts, &policy)?;
    let report = cleanup::execute(&session.tree, &plan, &policy)?;

    print_report(
        args.format,
        &report,
        &serde_json::json!({ "plan": &plan, "report": &report }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: BranchCleanupArgs,
    }

    fn parse(argv: &[&str]) -> BranchCleanupArgs {
        let mut full = vec!["branch-cleanup"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_simulated_by_default() {
        let policy = parse(&[]).policy(&Config::default()).unwrap();
        assert!(policy.pretend());
        assert!(policy.safe.matches("develop"));
        assert!(policy.protected.matches("master"));
    }

    #[test]
    fn test_lists_are_comma_separated_and_merged_with_config() {
        let config = Config {
            protected_branches: Some(vec!["gh-pages".to_string()]),
            ..Config::default()
        };
        let policy = parse(&[
            "--protected-branches",
            "keep/a,keep/b",
            "--safe-branches",
            "main",
            "--i-understand-the-risks",
        ])
        .policy(&config)
        .unwrap();

        assert!(policy.protected.matches("keep/b"));
        assert!(policy.protected.matches("gh-pages"));
        assert!(policy.safe.matches("main"));
        assert!(!policy.safe.matches("develop"));
        assert!(!policy.pretend());
    }
}
