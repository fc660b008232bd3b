//! Reusable rewrite actions
//!
//! Structural building blocks for schema migrations. Each one is a plain
//! [`TransformAction`] and can be registered against any pattern.

use tracing::trace;

use crate::cursor::NodeCursor;
use crate::node::ConfigNode;
use crate::path::{NodePath, PathSegment};
use crate::transform::TransformAction;

// ═══════════════════════════════════════════════════════════════════════════
// Relocate
// ═══════════════════════════════════════════════════════════════════════════

/// Moves the listed children of the matched node under a sub-mapping
#[derive(Debug, Clone)]
pub struct Relocate {
    keys: Vec<String>,
    into: String,
}

/// `relocate(&["prefix", "suffix"], "options")` turns `{prefix: x}` into
/// `{options: {prefix: x}}`. Absent keys are left alone.
pub fn relocate(keys: &[&str], into: &str) -> Relocate {
    Relocate {
        keys: keys.iter().map(|k| k.to_string()).collect(),
        into: into.to_string(),
    }
}

impl TransformAction for Relocate {
    fn visit(&self, node: &mut NodeCursor<'_>) -> Option<NodePath> {
        for key in &self.keys {
            if let Some(value) = node.clear_child(key.as_str()) {
                let target = node.path().child(self.into.as_str()).child(key.as_str());
                trace!(from = %node.path().child(key.as_str()), to = %target, "Relocating value");
                node.at(target).set(value);
            }
        }
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Map entry to sequence element
// ═══════════════════════════════════════════════════════════════════════════

/// Replaces the matched value with a one-element sequence holding it
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapInSequence;

/// Turns each keyed entry into an ordered list whose first element is the
/// former value. Values that are already sequences are left unchanged.
pub fn wrap_in_sequence() -> WrapInSequence {
    WrapInSequence
}

impl TransformAction for WrapInSequence {
    fn visit(&self, node: &mut NodeCursor<'_>) -> Option<NodePath> {
        let current = node.get_mut()?;
        if matches!(current, ConfigNode::Sequence(_)) {
            return None;
        }
        let value = std::mem::take(current);
        *current = ConfigNode::Sequence(vec![value]);
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Split nested map to tagged siblings
// ═══════════════════════════════════════════════════════════════════════════

/// Flattens a nested mapping into sibling sequence elements
#[derive(Debug, Clone)]
pub struct SplitToTaggedSiblings {
    levels_up: usize,
    tag: Vec<PathSegment>,
}

/// For every entry of the matched mapping, append a copy of the entry's value
/// to the sequence `levels_up` steps above the match, with `tag` set to the
/// entry's key. The matched mapping is cleared afterwards.
///
/// With `levels_up = 2` and tag `context.world`, the match
/// `users.alice.0.worlds = {nether: {...}}` appends
/// `{..., context: {world: nether}}` to `users.alice`.
pub fn split_to_tagged_siblings(levels_up: usize, tag: &[&str]) -> SplitToTaggedSiblings {
    SplitToTaggedSiblings {
        levels_up,
        tag: tag.iter().map(|s| PathSegment::from(*s)).collect(),
    }
}

impl TransformAction for SplitToTaggedSiblings {
    fn visit(&self, node: &mut NodeCursor<'_>) -> Option<NodePath> {
        let entries = match node.get()? {
            ConfigNode::Mapping(map) => map.clone(),
            _ => return None,
        };

        {
            let mut owner = node.ancestor(self.levels_up)?;
            for (key, value) in entries {
                let mut sibling = value;
                sibling.set(&self.tag, ConfigNode::String(key));
                let appended = owner.append(sibling);
                trace!(path = %appended, "Appended tagged sibling");
            }
        }

        node.clear();
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Rename terminal segment
// ═══════════════════════════════════════════════════════════════════════════

/// Re-homes the matched node under a new final key
#[derive(Debug, Clone)]
pub struct RenameTerminal {
    new_key: String,
}

pub fn rename_terminal(new_key: &str) -> RenameTerminal {
    RenameTerminal {
        new_key: new_key.to_string(),
    }
}

impl TransformAction for RenameTerminal {
    fn visit(&self, node: &mut NodeCursor<'_>) -> Option<NodePath> {
        Some(node.path().with_last(self.new_key.as_str()))
    }
}
