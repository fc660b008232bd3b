//! Tree transformations
//!
//! A [`Transformation`] is an ordered list of `(PathPattern, action)` rules.
//! Applying it runs the rules in registration order. For each rule every
//! matching path is collected first and only then are actions invoked, so an
//! action that inserts or removes siblings never disturbs the traversal of the
//! rule it belongs to.
//!
//! # Re-homing
//!
//! An action may return a path. When that path differs from the matched one,
//! the matched node's value is moved there (overwriting whatever was stored)
//! and the source is cleared.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::cursor::NodeCursor;
use crate::node::ConfigNode;
use crate::path::NodePath;
use crate::pattern::PathPattern;

/// Rewrite applied to each node matched by a rule
pub trait TransformAction: Send + Sync {
    /// Visit one matched node; return a new path to move the node there
    fn visit(&self, node: &mut NodeCursor<'_>) -> Option<NodePath>;
}

impl<F> TransformAction for F
where
    F: Fn(&mut NodeCursor<'_>) -> Option<NodePath> + Send + Sync,
{
    fn visit(&self, node: &mut NodeCursor<'_>) -> Option<NodePath> {
        self(node)
    }
}

/// Pins a closure to the [`TransformAction`] signature
pub fn action_fn<F>(f: F) -> F
where
    F: Fn(&mut NodeCursor<'_>) -> Option<NodePath> + Send + Sync + 'static,
{
    f
}

/// Counters from one [`Transformation::apply`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Actions invoked
    pub visited: usize,
    /// Snapshot entries that had become virtual before their turn
    pub skipped: usize,
    /// Nodes moved to an action-returned path
    pub rehomed: usize,
}

impl TransformStats {
    fn merge(&mut self, other: TransformStats) {
        self.visited += other.visited;
        self.skipped += other.skipped;
        self.rehomed += other.rehomed;
    }
}

/// Ordered set of rewrite rules
#[derive(Clone, Default)]
pub struct Transformation {
    rules: Vec<(PathPattern, Arc<dyn TransformAction>)>,
}

impl std::fmt::Debug for Transformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformation")
            .field(
                "patterns",
                &self.rules.iter().map(|(p, _)| p.to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Transformation {
    pub fn builder() -> TransformationBuilder {
        TransformationBuilder::default()
    }

    /// Concatenate transformations; rules keep their relative order
    pub fn chain(transformations: impl IntoIterator<Item = Transformation>) -> Self {
        Self {
            rules: transformations
                .into_iter()
                .flat_map(|t| t.rules)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule to `root` in registration order
    pub fn apply(&self, root: &mut ConfigNode) -> TransformStats {
        let mut stats = TransformStats::default();
        for (pattern, action) in &self.rules {
            stats.merge(apply_rule(root, pattern, action.as_ref()));
        }
        stats
    }
}

fn apply_rule(root: &mut ConfigNode, pattern: &PathPattern, action: &dyn TransformAction) -> TransformStats {
    let mut stats = TransformStats::default();
    let snapshot = pattern.collect_matches(root);
    debug!(pattern = %pattern, matches = snapshot.len(), "Applying transformation rule");

    for path in snapshot {
        if root.is_virtual(&path) {
            trace!(path = %path, "Skipping node removed earlier in this pass");
            stats.skipped += 1;
            continue;
        }

        stats.visited += 1;
        let target = {
            let mut cursor = NodeCursor::new(root, path.clone());
            action.visit(&mut cursor)
        };

        let Some(target) = target else { continue };
        if target == path {
            continue;
        }
        if let Some(value) = root.remove(&path) {
            trace!(from = %path, to = %target, "Re-homing node");
            root.set(&target, value);
            stats.rehomed += 1;
        }
    }

    stats
}

/// Builder for [`Transformation`]
#[derive(Default)]
pub struct TransformationBuilder {
    rules: Vec<(PathPattern, Arc<dyn TransformAction>)>,
}

impl TransformationBuilder {
    pub fn add_action(mut self, pattern: PathPattern, action: impl TransformAction + 'static) -> Self {
        self.rules.push((pattern, Arc::new(action)));
        self
    }

    pub fn build(self) -> Transformation {
        Transformation { rules: self.rules }
    }
}
