//! End-to-end tests for the `tree` command.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_tree_help() {
    let mut cmd = cargo_bin_cmd!("cactus");

    cmd.arg("tree")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Show the checkouts of the submodule tree"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_tree_shows_checkouts_and_branches() {
    let fixture = TreeFixture::new("telenav", &["kivakit", "mesakit"]);
    std::fs::write(fixture.submodule("mesakit").join("pom.xml"), "changed").unwrap();

    fixture
        .command()
        .args(["tree", "--group-ids"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[TREE] Submodule tree at"))
        .stdout(predicate::str::contains("telenav [develop]"))
        .stdout(predicate::str::contains("kivakit [develop] com.telenav.kivakit"))
        .stdout(predicate::str::contains("mesakit [develop] (modified)"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_tree_from_inside_a_submodule_shows_whole_tree() {
    let fixture = TreeFixture::new("telenav", &["kivakit", "mesakit"]);

    fixture
        .command_in(&fixture.submodule("kivakit"))
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("telenav [develop]"))
        .stdout(predicate::str::contains("mesakit [develop]"));
}
