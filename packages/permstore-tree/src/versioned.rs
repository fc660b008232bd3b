//! Versioned migrations
//!
//! A [`VersionedTransformation`] maps version `N` to the [`Transformation`]
//! that migrates schema `N` to `N + 1`. The stored version lives at a
//! configurable key (default `schema-version`, `-1` when absent).
//!
//! Applying it runs every transformation keyed at or above
//! `max(stored, 0)` in ascending order and writes the highest applied key plus
//! one. A tree whose stored version is already at or above the highest key is
//! left untouched, so running a migration twice is a no-op.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::node::ConfigNode;
use crate::path::{NodePath, PathSegment};
use crate::transform::Transformation;

pub const DEFAULT_VERSION_KEY: &str = "schema-version";

/// Version reported for trees that carry no version field
pub const UNVERSIONED: i32 = -1;

/// Result of a versioned migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub from: i32,
    pub to: i32,
}

impl MigrationOutcome {
    /// True when the tree was migrated and should be persisted
    pub fn changed(&self) -> bool {
        self.to > self.from
    }
}

/// Ascending chain of transformations keyed by source version
#[derive(Debug, Clone)]
pub struct VersionedTransformation {
    version_key: NodePath,
    versions: BTreeMap<i32, Transformation>,
}

impl VersionedTransformation {
    pub fn builder() -> VersionedTransformationBuilder {
        VersionedTransformationBuilder::default()
    }

    pub fn version_key(&self) -> &NodePath {
        &self.version_key
    }

    /// Highest registered source version
    pub fn latest_version(&self) -> Option<i32> {
        self.versions.keys().next_back().copied()
    }

    /// Version a fully migrated tree carries
    pub fn target_version(&self) -> i32 {
        self.latest_version().map_or(UNVERSIONED, |v| v + 1)
    }

    /// Stored version of `root`, [`UNVERSIONED`] when absent or not an integer
    pub fn stored_version(&self, root: &ConfigNode) -> i32 {
        root.get(&self.version_key)
            .and_then(ConfigNode::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(UNVERSIONED)
    }

    pub fn apply(&self, root: &mut ConfigNode) -> MigrationOutcome {
        let from = self.stored_version(root);
        let Some(latest) = self.latest_version() else {
            return MigrationOutcome { from, to: from };
        };
        if from >= latest {
            debug!(version = from, latest, "Tree already at latest schema");
            return MigrationOutcome { from, to: from };
        }

        let mut applied = from;
        for (&version, transformation) in self.versions.range(from.max(0)..) {
            let stats = transformation.apply(root);
            debug!(
                version,
                visited = stats.visited,
                skipped = stats.skipped,
                rehomed = stats.rehomed,
                "Applied schema transformation"
            );
            applied = version;
        }

        let to = applied + 1;
        root.set(&self.version_key, ConfigNode::Int(to as i64));
        info!(from, to, "Upgraded schema version");
        MigrationOutcome { from, to }
    }
}

/// Builder for [`VersionedTransformation`]
pub struct VersionedTransformationBuilder {
    version_key: NodePath,
    versions: BTreeMap<i32, Transformation>,
}

impl Default for VersionedTransformationBuilder {
    fn default() -> Self {
        Self {
            version_key: NodePath::new(vec![PathSegment::from(DEFAULT_VERSION_KEY)]),
            versions: BTreeMap::new(),
        }
    }
}

impl VersionedTransformationBuilder {
    pub fn version_key(mut self, key: impl Into<NodePath>) -> Self {
        self.version_key = key.into();
        self
    }

    /// Register the transformation migrating `version` to `version + 1`
    pub fn add_version(mut self, version: i32, transformation: Transformation) -> Self {
        self.versions.insert(version, transformation);
        self
    }

    pub fn build(self) -> VersionedTransformation {
        VersionedTransformation {
            version_key: self.version_key,
            versions: self.versions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PathPattern;
    use crate::transform::action_fn;
    use pretty_assertions::assert_eq;

    /// Each version appends its own number to `log`
    fn logging_chain(versions: &[i32]) -> VersionedTransformation {
        let mut builder = VersionedTransformation::builder();
        for &version in versions {
            builder = builder.add_version(
                version,
                Transformation::builder()
                    .add_action(
                        PathPattern::new(Vec::new()),
                        action_fn(move |cursor| {
                            cursor.child("log").append(ConfigNode::Int(version as i64));
                            None
                        }),
                    )
                    .build(),
            );
        }
        builder.build()
    }

    fn log(root: &ConfigNode) -> Vec<String> {
        root.get(&NodePath::from(["log"]))
            .map(ConfigNode::string_list)
            .unwrap_or_default()
    }

    #[test]
    fn test_unversioned_tree_runs_everything() {
        let mut tree = ConfigNode::mapping();
        let outcome = logging_chain(&[0, 1, 2]).apply(&mut tree);

        assert_eq!(outcome, MigrationOutcome { from: -1, to: 3 });
        assert!(outcome.changed());
        assert_eq!(log(&tree), vec!["0", "1", "2"]);
        assert_eq!(tree.get(&NodePath::from(["schema-version"])), Some(&ConfigNode::Int(3)));
    }

    #[test]
    fn test_starts_at_stored_version() {
        let mut tree = ConfigNode::mapping();
        tree.set(&NodePath::from(["schema-version"]), ConfigNode::Int(1));

        let outcome = logging_chain(&[0, 1, 2]).apply(&mut tree);
        assert_eq!(outcome, MigrationOutcome { from: 1, to: 3 });
        assert_eq!(log(&tree), vec!["1", "2"]);
    }

    #[test]
    fn test_idempotent_at_latest() {
        let chain = logging_chain(&[0, 1, 2]);
        let mut tree = ConfigNode::mapping();
        chain.apply(&mut tree);
        let migrated = tree.clone();

        let outcome = chain.apply(&mut tree);
        assert!(!outcome.changed());
        assert_eq!(outcome, MigrationOutcome { from: 3, to: 3 });
        assert_eq!(tree, migrated);
    }

    #[test]
    fn test_stored_equal_to_highest_key_is_noop() {
        let mut tree = ConfigNode::mapping();
        tree.set(&NodePath::from(["schema-version"]), ConfigNode::Int(2));
        let before = tree.clone();

        let outcome = logging_chain(&[0, 1, 2]).apply(&mut tree);
        assert!(!outcome.changed());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_custom_version_key() {
        let chain = VersionedTransformation::builder()
            .version_key(NodePath::from(["meta", "version"]))
            .add_version(0, Transformation::default())
            .build();
        let mut tree = ConfigNode::mapping();

        assert_eq!(chain.apply(&mut tree).to, 1);
        assert_eq!(tree.get(&NodePath::from(["meta", "version"])), Some(&ConfigNode::Int(1)));
        assert_eq!(chain.target_version(), 1);
    }

    #[test]
    fn test_empty_chain_never_writes() {
        let chain = VersionedTransformation::builder().build();
        let mut tree = ConfigNode::mapping();
        assert!(!chain.apply(&mut tree).changed());
        assert_eq!(tree, ConfigNode::mapping());
    }
}
