//! Property-based tests for the merge engine and unit labeling.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::merge::{value, Merge, OverrideSpec};
    use crate::unit::{ClusterUnit, ManagedUnit};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn override_spec_strategy() -> impl Strategy<Value = OverrideSpec> {
        (
            proptest::collection::vec("--[a-z]{1,8}", 0..4),
            proptest::collection::btree_map("[A-Z]{1,6}", "[a-z0-9]{1,8}", 0..4),
        )
            .prop_map(|(cli_args, env)| OverrideSpec {
                cli_args,
                env,
                config_files: BTreeMap::new(),
                patch: serde_json::Value::Null,
            })
    }

    // ============================================================================
    // Merge identity and determinism
    // ============================================================================

    proptest! {
        /// Property: merging with an empty overlay returns the original
        #[test]
        fn merge_with_default_overlay_is_identity(spec in override_spec_strategy()) {
            let merged = spec.merge(&OverrideSpec::default());
            prop_assert_eq!(merged, spec);
        }

        /// Property: merging an empty original takes the overlay
        #[test]
        fn merge_onto_default_original_takes_overlay(spec in override_spec_strategy()) {
            let merged = OverrideSpec::default().merge(&spec);
            prop_assert_eq!(merged, spec);
        }

        /// Property: merge is deterministic (same inputs = same output)
        #[test]
        fn merge_is_deterministic(
            original in override_spec_strategy(),
            overlay in override_spec_strategy(),
        ) {
            let first = original.merge(&overlay);
            let second = original.merge(&overlay);
            prop_assert_eq!(first, second);
        }
    }

    // ============================================================================
    // Sequence concatenation
    // ============================================================================

    proptest! {
        /// Property: sequence merge length is additive
        #[test]
        fn sequence_merge_length_is_additive(
            original in proptest::collection::vec("[a-z]{1,6}", 0..6),
            overlay in proptest::collection::vec("[a-z]{1,6}", 0..6),
        ) {
            let merged = original.merge(&overlay);
            prop_assert_eq!(merged.len(), original.len() + overlay.len());
        }

        /// Property: original entries come first, overlay entries after
        #[test]
        fn sequence_merge_preserves_order(
            original in proptest::collection::vec("[a-z]{1,6}", 0..6),
            overlay in proptest::collection::vec("[a-z]{1,6}", 0..6),
        ) {
            let merged = original.merge(&overlay);
            prop_assert_eq!(&merged[..original.len()], &original[..]);
            prop_assert_eq!(&merged[original.len()..], &overlay[..]);
        }

        /// Property: re-applying a non-empty overlay duplicates entries,
        /// the documented non-idempotence of the append policy
        #[test]
        fn sequence_merge_is_not_idempotent(
            original in proptest::collection::vec("[a-z]{1,6}", 0..4),
            overlay in proptest::collection::vec("[a-z]{1,6}", 1..4),
        ) {
            let once = original.merge(&overlay);
            let twice = once.merge(&overlay);
            prop_assert_eq!(twice.len(), original.len() + 2 * overlay.len());
        }
    }

    // ============================================================================
    // Atomic leaves
    // ============================================================================

    proptest! {
        /// Property: an atomic merge result is always one of its inputs
        #[test]
        fn atomic_merge_picks_one_input(
            original in "[a-z]{0,8}",
            overlay in "[a-z]{0,8}",
        ) {
            let merged = original.clone().merge(&overlay);
            prop_assert!(merged == original || merged == overlay);
        }

        /// Property: a set overlay always wins
        #[test]
        fn atomic_merge_set_overlay_wins(
            original in "[a-z]{0,8}",
            overlay in "[a-z]{1,8}",
        ) {
            let merged = original.merge(&overlay);
            prop_assert_eq!(merged, overlay);
        }
    }

    // ============================================================================
    // Raw value merge
    // ============================================================================

    proptest! {
        /// Property: a null overlay leaves any fragment unchanged
        #[test]
        fn value_merge_null_overlay_is_identity(
            entries in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{1,8}", 0..5),
        ) {
            let fragment = serde_json::to_value(&entries).unwrap();
            let merged = value::merged(&fragment, &serde_json::Value::Null);
            prop_assert_eq!(merged, fragment);
        }

        /// Property: merging a fragment onto null takes the fragment
        #[test]
        fn value_merge_onto_null_takes_overlay(
            entries in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{1,8}", 0..5),
        ) {
            let fragment = serde_json::to_value(&entries).unwrap();
            let merged = value::merged(&serde_json::Value::Null, &fragment);
            prop_assert_eq!(merged, fragment);
        }

        /// Property: every overlay key is present with the overlay's value
        #[test]
        fn value_merge_overlay_keys_win(
            original in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{1,8}", 0..5),
            overlay in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{1,8}", 0..5),
        ) {
            let merged = value::merged(
                &serde_json::to_value(&original).unwrap(),
                &serde_json::to_value(&overlay).unwrap(),
            );
            for (key, expected) in &overlay {
                prop_assert_eq!(merged[key].as_str(), Some(expected.as_str()));
            }
        }
    }

    // ============================================================================
    // Unit labeling
    // ============================================================================

    proptest! {
        /// Property: the selector subset is contained in the full label set
        /// for every generated unit
        #[test]
        fn matching_labels_always_subset_of_labels(
            cluster in "[a-z][a-z0-9]{0,8}",
            role in "[a-z][a-z0-9]{0,8}",
            group in "[a-z][a-z0-9]{0,8}",
        ) {
            let unit = ClusterUnit::new("database-operator", &cluster, "prod")
                .unwrap()
                .role(&role)
                .unwrap()
                .group(&group)
                .unwrap();

            let labels = unit.labels();
            for (key, val) in unit.matching_labels() {
                prop_assert_eq!(labels.get(&key), Some(&val));
            }
        }

        /// Property: composed names follow the canonical scheme
        #[test]
        fn unit_names_compose_canonically(
            cluster in "[a-z][a-z0-9]{0,8}",
            role in "[a-z][a-z0-9]{0,8}",
            group in "[a-z][a-z0-9]{0,8}",
        ) {
            let role_unit = ClusterUnit::new("database-operator", &cluster, "prod")
                .unwrap()
                .role(&role)
                .unwrap();
            let group_unit = role_unit.group(&group).unwrap();

            prop_assert_eq!(role_unit.name(), format!("{}-{}", cluster, role));
            prop_assert_eq!(group_unit.name(), format!("{}-{}-{}", cluster, role, group));
        }
    }
}
