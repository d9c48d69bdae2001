//! # Cactus
//!
//! Branch orchestration for a tree of git submodules that together make up
//! one multi-repository build. This library does the work behind the
//! `cactus` command-line tool and can be used on its own.
//!
//! ## Quick Example
//!
//! ```
//! use cactus::branch::Branches;
//!
//! let branches = Branches::parse(
//!     "* develop\n  feature/x\n  remotes/origin/HEAD -> origin/develop\n  remotes/origin/develop\n",
//! )
//! .unwrap();
//!
//! assert!(branches.is_on("develop"));
//! assert!(branches.local("feature/x").is_some());
//! assert!(branches.remote("feature/x").is_none());
//! ```
//!
//! ## Core Concepts
//!
//! - **Checkouts (`checkout`, `tree`)**: every working copy in the tree,
//!   discovered from any directory inside it, with a per-checkout cache of
//!   branch state.
//! - **Branches (`branch`)**: what exists locally and remotely in one
//!   checkout, and where it currently is.
//! - **Scopes (`scope`)**: which checkouts an operation applies to, by
//!   project family, group id, or all of them.
//! - **Engines (`branching`, `cleanup`, `automerge`, `consistency`)**: decide
//!   per checkout what to do, validate the whole batch, then run it.
//! - **Tasks (`tasks`)**: ordered, nestable actions with pretend support and
//!   a report of what ran.
//! - **Git (`repository`, `git`, `gitmodules`)**: the `GitOperations` seam
//!   and its implementation on top of the system `git`.
//!
//! ## Execution Flow
//!
//! 1.  **Discovery**: find the submodule root and its checkouts.
//! 2.  **Scoping**: select the checkouts to work on, deepest first.
//! 3.  **Refresh**: fetch, so decisions use current remote knowledge.
//! 4.  **Decision**: classify each checkout into exactly one action.
//! 5.  **Validation**: collect every problem in the batch; abort on any.
//! 6.  **Execution**: run actions root first, then post-actions in reverse.

pub mod automerge;
pub mod branch;
pub mod branching;
pub mod checkout;
pub mod cleanup;
pub mod config;
pub mod consistency;
pub mod defaults;
pub mod error;
pub mod git;
pub mod gitmodules;
pub mod maven;
pub mod output;
pub mod repository;
pub mod scope;
pub mod tasks;
pub mod tree;

#[cfg(test)]
mod branch_proptest;
#[cfg(test)]
mod test_support;
