//! Property-based tests for the transformation engine
//!
//! Invariants that should hold for every generated tree:
//! - Matching: every collected path has the pattern's length and resolves
//! - Idempotence: a second versioned migration changes nothing
//! - Monotonicity: the stored version never decreases

use permstore_tree::{
    actions, ConfigNode, NodePath, PathPattern, Transformation, VersionedTransformation,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn leaf() -> impl Strategy<Value = ConfigNode> {
    prop_oneof![
        Just(ConfigNode::Null),
        any::<bool>().prop_map(ConfigNode::Bool),
        (-1000i64..1000).prop_map(ConfigNode::Int),
        "[a-z]{1,6}".prop_map(ConfigNode::String),
    ]
}

fn tree() -> impl Strategy<Value = ConfigNode> {
    leaf().prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(ConfigNode::Sequence),
            prop::collection::btree_map(
                prop_oneof![
                    Just("prefix".to_string()),
                    Just("suffix".to_string()),
                    Just("worlds".to_string()),
                    "[a-z]{1,4}",
                ],
                inner,
                0..5
            )
            .prop_map(ConfigNode::Mapping),
        ]
    })
}

fn migration() -> VersionedTransformation {
    VersionedTransformation::builder()
        .add_version(
            1,
            Transformation::builder()
                .add_action(
                    "*.*".parse::<PathPattern>().unwrap(),
                    actions::relocate(&["prefix", "suffix"], "options"),
                )
                .build(),
        )
        .add_version(
            2,
            Transformation::builder()
                .add_action("*.*".parse::<PathPattern>().unwrap(), actions::wrap_in_sequence())
                .build(),
        )
        .build()
}

/// Trees as stored on disk always have a mapping root
fn rooted(node: ConfigNode) -> ConfigNode {
    let mut root = ConfigNode::mapping();
    root.set(&NodePath::from(["data"]), node);
    root
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_matches_have_pattern_length(node in tree(), depth in 1usize..4) {
        let pattern: PathPattern = vec!["*"; depth].join(".").parse().unwrap();
        for path in pattern.collect_matches(&node) {
            prop_assert_eq!(path.len(), depth);
            prop_assert!(pattern.matches(&path));
            prop_assert!(node.get(&path).is_some());
        }
    }

    #[test]
    fn prop_migration_is_idempotent(node in tree()) {
        let chain = migration();
        let mut root = rooted(node);

        let first = chain.apply(&mut root);
        prop_assert!(first.changed());
        prop_assert_eq!(first.to, 3);

        let migrated = root.clone();
        let second = chain.apply(&mut root);
        prop_assert!(!second.changed());
        prop_assert_eq!(root, migrated);
    }

    #[test]
    fn prop_version_never_decreases(node in tree(), stored in -3i64..6) {
        let chain = migration();
        let mut root = rooted(node);
        root.set(&NodePath::from(["schema-version"]), ConfigNode::Int(stored));

        let outcome = chain.apply(&mut root);
        prop_assert!(outcome.to >= outcome.from);
        prop_assert!(i64::from(outcome.to) >= stored.max(-1));
    }
}
