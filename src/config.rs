//! # Configuration File
//!
//! Optional YAML settings that save typing the same options on every run.
//!
//! Settings are layered, later layers winning field by field:
//!
//! 1. Built-in defaults ([`crate::defaults`]).
//! 2. The per-user file ([`crate::defaults::user_config_file`]).
//! 3. The project file: `.cactus.yaml` in the submodule root, or the file
//!    given with `--config` / `CACTUS_CONFIG`.
//! 4. Command-line options.
//!
//! ```yaml
//! base-branch: develop
//! stable-branch: stable
//! safe-branches: [develop, release/current, publish]
//! protected-branch-patterns: ["release/.*"]
//! commit-message: "Move submodules to {branch}"
//! scope: family
//! ```

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::branch::validate_branch_name;
use crate::cleanup::DEFAULT_SAFE_BRANCHES;
use crate::defaults::{self, CONFIG_FILE, DEFAULT_BASE_BRANCH, DEFAULT_STABLE_BRANCH};
use crate::error::{Error, Result};
use crate::scope::Scope;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub base_branch: Option<String>,
    pub stable_branch: Option<String>,
    pub safe_branches: Option<Vec<String>>,
    pub safe_branch_patterns: Option<Vec<String>>,
    pub protected_branches: Option<Vec<String>>,
    pub protected_branch_patterns: Option<Vec<String>>,
    /// Root commit message; `{branch}` is replaced with the target branch.
    pub commit_message: Option<String>,
    pub scope: Option<Scope>,
}

/// Parses YAML text. An empty document is an empty configuration.
pub fn parse(yaml_content: &str) -> Result<Config> {
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(yaml_content)?;
    config.validate()?;
    Ok(config)
}

pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse(&content).map_err(|e| Error::Config {
        message: format!("invalid configuration in {}: {}", path.display(), e),
        hint: None,
    })
}

/// Loads the user file, then `explicit` or the root's `.cactus.yaml`.
pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Config> {
    load_layers(defaults::user_config_file().as_deref(), explicit, root)
}

/// [`load`] with the user file location given.
pub fn load_layers(
    user_file: Option<&Path>,
    explicit: Option<&Path>,
    root: &Path,
) -> Result<Config> {
    let mut config = Config::default();
    if let Some(user_file) = user_file.filter(|f| f.is_file()) {
        debug!("Reading user configuration {}", user_file.display());
        config = config.merged(from_file(user_file)?);
    }
    match explicit {
        Some(file) => {
            if !file.is_file() {
                return Err(Error::Config {
                    message: format!("configuration file {} does not exist", file.display()),
                    hint: Some("check --config or CACTUS_CONFIG".to_string()),
                });
            }
            config = config.merged(from_file(file)?);
        }
        None => {
            let project_file = root.join(CONFIG_FILE);
            if project_file.is_file() {
                debug!("Reading project configuration {}", project_file.display());
                config = config.merged(from_file(&project_file)?);
            }
        }
    }
    Ok(config)
}

impl Config {
    /// `other`'s settings win wherever it has any.
    pub fn merged(self, other: Config) -> Config {
        Config {
            base_branch: other.base_branch.or(self.base_branch),
            stable_branch: other.stable_branch.or(self.stable_branch),
            safe_branches: other.safe_branches.or(self.safe_branches),
            safe_branch_patterns: other.safe_branch_patterns.or(self.safe_branch_patterns),
            protected_branches: other.protected_branches.or(self.protected_branches),
            protected_branch_patterns: other
                .protected_branch_patterns
                .or(self.protected_branch_patterns),
            commit_message: other.commit_message.or(self.commit_message),
            scope: other.scope.or(self.scope),
        }
    }

    fn validate(&self) -> Result<()> {
        for name in [&self.base_branch, &self.stable_branch].into_iter().flatten() {
            validate_branch_name(name)?;
        }
        for name in [&self.safe_branches, &self.protected_branches]
            .into_iter()
            .flatten()
            .flatten()
        {
            validate_branch_name(name)?;
        }
        Ok(())
    }

    pub fn base_branch(&self) -> &str {
        self.base_branch.as_deref().unwrap_or(DEFAULT_BASE_BRANCH)
    }

    pub fn stable_branch(&self) -> &str {
        self.stable_branch
            .as_deref()
            .unwrap_or(DEFAULT_STABLE_BRANCH)
    }

    pub fn safe_branches(&self) -> Vec<String> {
        self.safe_branches.clone().unwrap_or_else(|| {
            DEFAULT_SAFE_BRANCHES
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }
}
