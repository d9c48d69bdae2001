//! Property-based tests for the branch model.
//!
//! These tests use proptest to generate branch listings and names and verify
//! that the `Branches` invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::branch::{validate_branch_name, Branch, Branches};
    use proptest::prelude::*;

    fn branch_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,8}(/[a-z][a-z0-9-]{0,8}){0,2}"
    }

    fn remote_name() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some("origin".to_string())),
            Just(Some("upstream".to_string())),
        ]
    }

    proptest! {
        /// Property: generated names are valid git branch names
        #[test]
        fn generated_names_validate(name in branch_name()) {
            prop_assert!(validate_branch_name(&name).is_ok());
        }

        /// Property: a local branch sorts before every remote branch of the same name
        #[test]
        fn local_sorts_first(name in branch_name(), remote in "[a-z]{1,8}") {
            prop_assert!(Branch::local(name.clone()) < Branch::remote(remote, name));
        }

        /// Property: tracking name ends with the branch name and carries the remote prefix
        #[test]
        fn tracking_name_shape(name in branch_name(), remote in remote_name()) {
            let branch = match &remote {
                Some(r) => Branch::remote(r.clone(), name.clone()),
                None => Branch::local(name.clone()),
            };
            let tracking = branch.tracking_name();
            prop_assert!(tracking.ends_with(&name));
            match remote {
                Some(r) => prop_assert_eq!(tracking, format!("{}/{}", r, name)),
                None => prop_assert_eq!(tracking, name),
            }
        }

        /// Property: rendering branches as `git branch -a` output and parsing
        /// it back yields the same snapshot
        #[test]
        fn parse_recovers_rendered_listing(
            entries in proptest::collection::btree_set((branch_name(), remote_name()), 1..12),
            current_index in any::<prop::sample::Index>(),
        ) {
            let branches: Vec<Branch> = entries
                .iter()
                .map(|(name, remote)| match remote {
                    Some(r) => Branch::remote(r.clone(), name.clone()),
                    None => Branch::local(name.clone()),
                })
                .collect();
            let locals: Vec<&Branch> = branches.iter().filter(|b| b.is_local()).collect();
            let current = if locals.is_empty() {
                None
            } else {
                Some(locals[current_index.index(locals.len())].clone())
            };

            let mut listing = String::new();
            for branch in &branches {
                let marker = if Some(branch) == current.as_ref() { "* " } else { "  " };
                match branch.remote_name() {
                    Some(r) => {
                        listing.push_str(&format!("{}remotes/{}/{}\n", marker, r, branch.name()))
                    }
                    None => listing.push_str(&format!("{}{}\n", marker, branch.name())),
                }
            }

            let parsed = Branches::parse(&listing).unwrap();
            let expected = Branches::new(branches.clone(), current).unwrap();
            prop_assert_eq!(parsed, expected);
        }

        /// Property: the current branch of a parsed listing is always local
        #[test]
        fn parsed_current_is_local(
            names in proptest::collection::btree_set(branch_name(), 1..6),
        ) {
            let mut listing = String::new();
            for (i, name) in names.iter().enumerate() {
                let marker = if i == 0 { "* " } else { "  " };
                listing.push_str(&format!("{}{}\n  remotes/origin/{}\n", marker, name, name));
            }
            let parsed = Branches::parse(&listing).unwrap();
            prop_assert!(parsed.current().is_some_and(|b| b.is_local()));
        }
    }
}
