//! # Scope Resolution
//!
//! Decides which checkouts of a [`ProjectTree`] an operation applies to.
//!
//! Most scopes are defined in terms of project *families*. A family is
//! derived from a Maven group id: `com.telenav.kivakit` belongs to the
//! `kivakit` family, and `com.telenav.kivakit.extensions` belongs to the
//! `extensions` family whose parent family is `kivakit`.
//!
//! Results are ordered deepest first so that children are always handled
//! before the submodule root that records them.

use std::cmp::Reverse;
use std::fmt;

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::checkout::Checkout;
use crate::error::{Error, Result};
use crate::tree::ProjectTree;

/// Group ids with at least this many segments have a parent family.
const PARENT_FAMILY_MIN_SEGMENTS: usize = 4;

/// Which checkouts an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Only the checkout containing the working directory
    #[value(alias = "JUST_THIS")]
    JustThis,
    /// Checkouts containing a project of the family
    #[default]
    #[value(alias = "FAMILY")]
    Family,
    /// Checkouts of the family, and of families whose parent is the family
    #[value(alias = "FAMILY_OR_CHILD_FAMILY")]
    FamilyOrChildFamily,
    /// Checkouts containing a project with exactly the calling group id
    #[value(alias = "SAME_GROUP_ID")]
    SameGroupId,
    /// Every checkout in the tree
    #[value(alias = "ALL")]
    All,
}

/// A project family name, such as `kivakit`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProjectFamily(String);

impl ProjectFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `com.telenav.cactus` → `cactus`.
    pub fn of_group_id(group_id: &str) -> Option<Self> {
        group_id
            .rsplit('.')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(Self::new)
    }

    /// `com.telenav.kivakit.extensions` → `kivakit`; `com.telenav.kivakit`
    /// has none.
    pub fn parent_of_group_id(group_id: &str) -> Option<Self> {
        let segments: Vec<&str> = group_id.split('.').collect();
        if segments.len() < PARENT_FAMILY_MIN_SEGMENTS {
            return None;
        }
        Some(Self::new(segments[segments.len() - 2]))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn contains_group_id(&self, group_id: &str) -> bool {
        Self::of_group_id(group_id).as_ref() == Some(self)
    }

    /// True if `group_id` belongs to a child family of this one.
    pub fn is_parent_of_group_id(&self, group_id: &str) -> bool {
        Self::parent_of_group_id(group_id).as_ref() == Some(self)
    }
}

impl fmt::Display for ProjectFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Scope {
    /// Computes the checkouts this scope selects, deepest first.
    ///
    /// `family` and `group_id` default to those of the calling checkout's
    /// first project. A family scope with no family to go on is a
    /// configuration error.
    pub fn match_checkouts(
        self,
        tree: &ProjectTree,
        calling: &Checkout,
        include_root: bool,
        family: Option<&ProjectFamily>,
        group_id: Option<&str>,
    ) -> Result<Vec<Checkout>> {
        let calling_group_id = group_id
            .map(str::to_string)
            .or_else(|| tree.group_ids(calling).iter().next().cloned());
        let family = family
            .cloned()
            .or_else(|| calling_group_id.as_deref().and_then(ProjectFamily::of_group_id));

        let mut matched: Vec<Checkout> = match self {
            Scope::JustThis => vec![calling.clone()],
            Scope::All => tree.checkouts().to_vec(),
            Scope::Family | Scope::FamilyOrChildFamily => {
                let family = family.ok_or_else(|| Error::Config {
                    message: format!("no project family known for {}", calling),
                    hint: Some("pass --family, or run from inside a Maven project".to_string()),
                })?;
                let include_children = self == Scope::FamilyOrChildFamily;
                self.select(tree, |group_id| {
                    family.contains_group_id(group_id)
                        || (include_children && family.is_parent_of_group_id(group_id))
                })
            }
            Scope::SameGroupId => {
                let wanted = calling_group_id.ok_or_else(|| Error::Config {
                    message: format!("no group id known for {}", calling),
                    hint: Some("pass --group-id, or run from inside a Maven project".to_string()),
                })?;
                self.select(tree, |group_id| group_id == wanted)
            }
        };

        let root = tree.root();
        if self != Scope::JustThis {
            matched.retain(|c| c != root);
            if include_root && root.is_submodule_root() && !matched.is_empty() {
                matched.push(root.clone());
            }
        }

        matched.sort_by_key(|c| (Reverse(c.depth()), c.path().to_path_buf()));
        matched.dedup();
        debug!("Scope {:?} matched {} checkout(s)", self, matched.len());
        Ok(matched)
    }

    fn select(self, tree: &ProjectTree, matches: impl Fn(&str) -> bool) -> Vec<Checkout> {
        tree.checkouts()
            .iter()
            .filter(|checkout| tree.group_ids(checkout).iter().any(|g| matches(g)))
            .cloned()
            .collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        f.write_str(&value)
    }
}
