//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays the
//! submodule root and its checkouts with the branch each one is on.
//!
//! This command is a safe, read-only operation.

use std::borrow::Cow;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use cactus::checkout::Checkout;
use cactus::output::{self, emoji};
use cactus::tree::ProjectTree;

use super::Session;
use crate::cli::GlobalArgs;

/// Show the checkouts of the submodule tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Fetch before showing, so remote branch knowledge is current.
    #[arg(long)]
    pub fetch: bool,

    /// Also show each checkout's Maven group ids.
    #[arg(long)]
    pub group_ids: bool,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    if args.fetch {
        session.fetch(session.tree.checkouts())?;
    }

    println!(
        "{} Submodule tree at {}",
        emoji(&session.output, "🌵", "[TREE]"),
        session.tree.root().path().display()
    );
    let root = build_tree_node(&session.tree, &args)?;
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

fn build_tree_node(tree: &ProjectTree, args: &TreeArgs) -> Result<TreeNode> {
    let mut children = Vec::new();
    for checkout in tree.checkouts().iter().filter(|c| c.is_submodule()) {
        children.push(TreeNode {
            label: label(tree, checkout, args)?,
            children: vec![],
        });
    }
    Ok(TreeNode {
        label: label(tree, tree.root(), args)?,
        children,
    })
}

/// `kivakit [develop] (modified)`
fn label(tree: &ProjectTree, checkout: &Checkout, args: &TreeArgs) -> Result<String> {
    let branches = tree.branches(checkout)?;
    let mut label = match branches.current() {
        Some(current) => format!("{} [{}]", checkout, output::branch(current.name())),
        None => format!("{} [{}]", checkout, output::warning("detached")),
    };
    if tree.has_local_changes(checkout)? {
        label.push_str(&format!(" {}", output::warning("(modified)")));
    }
    if args.group_ids {
        let group_ids: Vec<&str> = tree.group_ids(checkout)
            .iter()
            .map(String::as_str)
            .collect();
        if !group_ids.is_empty() {
            label.push_str(&format!(" {}", output::dim(&group_ids.join(", "))));
        }
    }
    Ok(label)
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
