//! Default values for cactus configuration.
//!
//! Command-line options override the configuration files, which override
//! these.

use std::path::PathBuf;

pub const DEFAULT_BASE_BRANCH: &str = "develop";

pub const DEFAULT_STABLE_BRANCH: &str = "stable";

/// Project configuration file, looked for in the submodule root.
pub const CONFIG_FILE: &str = ".cactus.yaml";

/// Returns the per-user configuration file.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/cactus/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/cactus/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\cactus\config.yaml`
///
/// Returns `None` if the platform has no configuration directory.
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cactus").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_file_location() {
        if let Some(file) = user_config_file() {
            assert!(file.ends_with("cactus/config.yaml"));
        }
    }

    #[test]
    fn test_default_branches_are_valid() {
        crate::branch::validate_branch_name(DEFAULT_BASE_BRANCH).unwrap();
        crate::branch::validate_branch_name(DEFAULT_STABLE_BRANCH).unwrap();
    }
}
