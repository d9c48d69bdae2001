//! Shared test utilities for integration and E2E tests.
//!
//! This module builds real submodule trees in temporary directories: one
//! bare "remote" repository per project, and a working clone of the root
//! with every project added as a submodule on `develop`.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! #[cfg_attr(not(feature = "integration-tests"), ignore)]
//! fn test_example() {
//!     let fixture = TreeFixture::new("telenav", &["kivakit", "mesakit"]);
//!     fixture.command().arg("tree").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TreeFixture;
}

const IDENTITY: [(&str, &str); 4] = [
    ("GIT_AUTHOR_NAME", "Cactus Tests"),
    ("GIT_AUTHOR_EMAIL", "tests@cactus.invalid"),
    ("GIT_COMMITTER_NAME", "Cactus Tests"),
    ("GIT_COMMITTER_EMAIL", "tests@cactus.invalid"),
];

/// Runs git in `dir`, panicking with its stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "protocol.file.allow=always",
            "-c",
            "init.defaultBranch=develop",
        ])
        .args(args)
        .current_dir(dir)
        .envs(IDENTITY)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A minimal `pom.xml` declaring `group_id`.
pub fn pom(group_id: &str, artifact_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
    <modelVersion>4.0.0</modelVersion>
    <groupId>{}</groupId>
    <artifactId>{}</artifactId>
    <version>1.0.0-SNAPSHOT</version>
</project>
"#,
        group_id, artifact_id
    )
}

/// A submodule tree with bare remotes, all on `develop`.
pub struct TreeFixture {
    temp_dir: assert_fs::TempDir,
    root_name: String,
}

impl TreeFixture {
    /// Creates the root project `root` with each of `submodules` added as a
    /// submodule. Each project carries a `pom.xml` with group id
    /// `com.telenav.<name>`.
    pub fn new(root: &str, submodules: &[&str]) -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let fixture = Self {
            temp_dir,
            root_name: root.to_string(),
        };

        for name in submodules.iter().chain(std::iter::once(&root)) {
            fixture.create_remote(name);
        }

        let root_dir = fixture.root();
        git(
            fixture.temp_dir.path(),
            &["clone", "-q", &fixture.remote_url(root), root],
        );
        for name in submodules {
            git(
                &root_dir,
                &[
                    "submodule",
                    "add",
                    "-q",
                    "-b",
                    "develop",
                    &fixture.remote_url(name),
                    name,
                ],
            );
        }
        git(&root_dir, &["commit", "-q", "-m", "Add submodules"]);
        git(&root_dir, &["push", "-q", "origin", "develop"]);
        fixture
    }

    /// Seeds `remotes/<name>.git` with one commit on `develop`.
    fn create_remote(&self, name: &str) {
        let seed = self.temp_dir.child("seed").child(name);
        seed.create_dir_all()
            .expect("Failed to create seed directory");
        seed.child("pom.xml")
            .write_str(&pom(&format!("com.telenav.{}", name), name))
            .expect("Failed to write pom.xml");
        git(seed.path(), &["init", "-q"]);
        git(seed.path(), &["add", "-A"]);
        git(seed.path(), &["commit", "-q", "-m", "Initial commit"]);

        let remotes = self.temp_dir.child("remotes");
        remotes
            .create_dir_all()
            .expect("Failed to create remotes directory");
        git(
            remotes.path(),
            &[
                "clone",
                "-q",
                "--bare",
                &seed.path().display().to_string(),
                &format!("{}.git", name),
            ],
        );
    }

    /// URL of the bare remote for `name`.
    pub fn remote_url(&self, name: &str) -> String {
        self.temp_dir
            .path()
            .join("remotes")
            .join(format!("{}.git", name))
            .display()
            .to_string()
    }

    /// The root working copy.
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join(&self.root_name)
    }

    /// The working copy of submodule `name`.
    pub fn submodule(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// Current branch of the checkout at `dir`, empty when detached.
    pub fn current_branch(&self, dir: &Path) -> String {
        git(dir, &["branch", "--show-current"])
    }

    /// Commits a new file to the current branch of `dir`.
    #[allow(dead_code)]
    pub fn commit_file(&self, dir: &Path, file: &str, content: &str) {
        std::fs::write(dir.join(file), content).expect("Failed to write file");
        git(dir, &["add", file]);
        git(dir, &["commit", "-q", "-m", &format!("Add {}", file)]);
    }

    /// Writes `.cactus.yaml` into the root.
    #[allow(dead_code)]
    pub fn with_config(self, content: &str) -> Self {
        std::fs::write(self.root().join(".cactus.yaml"), content).expect("Failed to write config");
        self
    }

    /// A `cactus` command run from the root, isolated from the user's own
    /// configuration.
    pub fn command(&self) -> assert_cmd::Command {
        self.command_in(&self.root())
    }

    /// A `cactus` command run from `dir`.
    pub fn command_in(&self, dir: &Path) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cactus");
        cmd.current_dir(dir)
            .envs(IDENTITY)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("XDG_CONFIG_HOME", self.temp_dir.path().join("config"))
            .env_remove("CACTUS_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--color=never");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pom_names_group_id() {
        let pom = pom("com.telenav.kivakit", "kivakit");
        assert!(pom.contains("<groupId>com.telenav.kivakit</groupId>"));
    }
}
