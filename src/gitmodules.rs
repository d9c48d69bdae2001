//! Reading and updating a submodule root's `.gitmodules` file.
//!
//! The file is git-config syntax, which `rust-ini` reads well enough for
//! the handful of keys git puts there (`path`, `url`, `branch`). Writes go
//! through `git config --file`, which touches only the entry it sets.

use std::path::{Path, PathBuf};

use ini::Ini;
use log::debug;

use crate::error::{Error, Result};
use crate::git;

pub const GITMODULES: &str = ".gitmodules";

/// One `[submodule "name"]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submodule {
    pub name: String,
    pub path: PathBuf,
    pub url: Option<String>,
    pub branch: Option<String>,
}

/// True if `root` declares submodules.
pub fn exists(root: &Path) -> bool {
    root.join(GITMODULES).is_file()
}

/// All submodule entries declared in `root/.gitmodules`, in file order.
/// A missing file means no submodules.
pub fn read(root: &Path) -> Result<Vec<Submodule>> {
    if !exists(root) {
        return Ok(Vec::new());
    }
    let conf = Ini::load_from_file(root.join(GITMODULES))?;

    let mut submodules = Vec::new();
    for (section, properties) in conf.iter() {
        let Some(name) = section.and_then(submodule_name) else {
            continue;
        };
        let Some(path) = properties.get("path") else {
            debug!("Submodule {} in {} has no path", name, root.display());
            continue;
        };
        submodules.push(Submodule {
            name: name.to_string(),
            path: PathBuf::from(path),
            url: properties.get("url").map(str::to_string),
            branch: properties.get("branch").map(str::to_string),
        });
    }
    Ok(submodules)
}

/// Sets the `branch` entry of the submodule at `submodule_path`.
///
/// Returns `false` without touching the file when the entry already names
/// `branch`, so repeated runs leave the root clean.
pub fn set_branch(root: &Path, submodule_path: &Path, branch: &str) -> Result<bool> {
    let file = root.join(GITMODULES);
    let entry = read(root)?
        .into_iter()
        .find(|submodule| submodule.path == submodule_path);

    let Some(entry) = entry else {
        return Err(Error::Config {
            message: format!(
                "no submodule with path {} in {}",
                submodule_path.display(),
                file.display()
            ),
            hint: Some("run from inside a checkout listed in .gitmodules".to_string()),
        });
    };

    if entry.branch.as_deref() == Some(branch) {
        return Ok(false);
    }

    let key = format!("submodule.{}.branch", entry.name);
    git::set_config_in_file(root, Path::new(GITMODULES), &key, branch)?;
    debug!(
        "Set branch of submodule {} to {} in {}",
        submodule_path.display(),
        branch,
        file.display()
    );
    Ok(true)
}

/// `submodule "kivakit"` → `kivakit`.
fn submodule_name(section: &str) -> Option<&str> {
    section
        .strip_prefix("submodule")
        .map(|rest| rest.trim().trim_matches('"'))
        .filter(|name| !name.is_empty())
}
