//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::commands;

/// Cactus - Branch orchestration across a tree of git submodules
#[derive(Parser, Debug)]
#[command(name = "cactus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Colorize output (always, never, auto)
    #[arg(
        long,
        global = true,
        value_name = "WHEN",
        default_value = "auto",
        value_parser = ["auto", "always", "never"]
    )]
    pub color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,

    /// Configuration file to use instead of the submodule root's .cactus.yaml.
    #[arg(long, global = true, value_name = "FILE", env = "CACTUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory to work from. Defaults to the current directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move checkouts onto a common branch, creating it where needed
    Checkout(commands::checkout::CheckoutArgs),

    /// Delete feature branches whose work has landed in a safe branch
    BranchCleanup(commands::branch_cleanup::BranchCleanupArgs),

    /// Tag checkouts whose target branch has work not yet in the stable branch
    AutomergeTag(commands::automerge_tag::AutomergeTagArgs),

    /// Check that checkouts are on the same branch and recorded consistently
    Check(commands::check::CheckArgs),

    /// Show the checkouts of the submodule tree
    Tree(commands::tree::TreeArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.global.log_level);

        match self.command {
            Commands::Checkout(args) => commands::checkout::execute(args, &self.global),
            Commands::BranchCleanup(args) => commands::branch_cleanup::execute(args, &self.global),
            Commands::AutomergeTag(args) => commands::automerge_tag::execute(args, &self.global),
            Commands::Check(args) => commands::check::execute(args, &self.global),
            Commands::Tree(args) => commands::tree::execute(args, &self.global),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(log_level: &str) {
    let env = env_logger::Env::default().default_filter_or(log_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
