//! Project metadata lookup for Maven checkouts.
//!
//! Only the `groupId` of each project is needed, to decide which checkouts
//! belong to the same family. A project's own `<groupId>` wins; when it is
//! inherited, the `<parent>` block's `groupId` is used.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::Result;

pub const POM: &str = "pom.xml";

/// Directories never searched for projects.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", ".git"];

/// How far below a checkout root project files are looked for.
const MAX_DEPTH: usize = 4;

static PARENT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<parent>.*?</parent>").expect("valid regex"));
/// Blocks that mention other projects' group ids, outermost first.
static FOREIGN_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["dependencyManagement", "dependencies", "build", "profiles", "reporting"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?s)<{tag}>.*?</{tag}>")).expect("valid regex"))
        .collect()
});
static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static GROUP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<groupId>\s*([^<\s]+)\s*</groupId>").expect("valid regex"));

/// Extracts the effective group id from the text of a `pom.xml`.
pub fn group_id_of(pom: &str) -> Option<String> {
    let pom = COMMENTS.replace_all(pom, "");
    let parent_group = PARENT_BLOCK
        .find(&pom)
        .and_then(|parent| GROUP_ID.captures(parent.as_str()))
        .map(|c| c[1].to_string());

    let mut own = PARENT_BLOCK.replace_all(&pom, "").into_owned();
    for block in FOREIGN_BLOCKS.iter() {
        own = block.replace_all(&own, "").into_owned();
    }
    GROUP_ID
        .captures(&own)
        .map(|c| c[1].to_string())
        .or(parent_group)
}

/// Group ids of every project inside `checkout_root`, without descending
/// into nested checkouts (directories with their own `.git`).
pub fn group_ids_in(checkout_root: &Path) -> Result<BTreeSet<String>> {
    let mut group_ids = BTreeSet::new();

    let walker = WalkDir::new(checkout_root)
        .max_depth(MAX_DEPTH)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !SKIPPED_DIRS.contains(&name.as_ref()) && !entry.path().join(".git").exists()
        });

    for entry in walker {
        let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
        if !entry.file_type().is_file() || entry.file_name() != POM {
            continue;
        }
        let text = fs::read_to_string(entry.path())?;
        match group_id_of(&text) {
            Some(group_id) => {
                group_ids.insert(group_id);
            }
            None => debug!("No groupId in {}", entry.path().display()),
        }
    }
    Ok(group_ids)
}
