//! Node cursors
//!
//! A [`NodeCursor`] addresses one path inside a mutable tree. The node it
//! points at may be virtual; writing through the cursor materializes it.
//! Rewrite actions receive a cursor so they can reach parents and siblings
//! without holding overlapping borrows.

use crate::node::ConfigNode;
use crate::path::{NodePath, PathSegment};

/// Mutable handle on a path inside a tree
#[derive(Debug)]
pub struct NodeCursor<'a> {
    root: &'a mut ConfigNode,
    path: NodePath,
}

impl<'a> NodeCursor<'a> {
    pub fn new(root: &'a mut ConfigNode, path: NodePath) -> Self {
        Self { root, path }
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Final path segment (`None` at the root)
    pub fn key(&self) -> Option<&PathSegment> {
        self.path.last()
    }

    /// Stored value, `None` if virtual
    pub fn get(&self) -> Option<&ConfigNode> {
        self.root.get(&self.path)
    }

    pub fn get_mut(&mut self) -> Option<&mut ConfigNode> {
        self.root.get_mut(&self.path)
    }

    pub fn is_virtual(&self) -> bool {
        self.get().is_none()
    }

    /// Store a value here, creating parents as needed
    pub fn set(&mut self, value: ConfigNode) {
        self.root.set(&self.path, value);
    }

    /// Remove this node, returning what was stored
    pub fn clear(&mut self) -> Option<ConfigNode> {
        self.root.remove(&self.path)
    }

    /// Append to the sequence stored here, returning the new element's path
    pub fn append(&mut self, value: ConfigNode) -> NodePath {
        let index = self.root.append(&self.path, value);
        self.path.child(index)
    }

    pub fn child_value(&self, segment: impl Into<PathSegment>) -> Option<&ConfigNode> {
        self.root.get(&self.path.child(segment))
    }

    pub fn set_child(&mut self, segment: impl Into<PathSegment>, value: ConfigNode) {
        let path = self.path.child(segment);
        self.root.set(&path, value);
    }

    pub fn clear_child(&mut self, segment: impl Into<PathSegment>) -> Option<ConfigNode> {
        let path = self.path.child(segment);
        self.root.remove(&path)
    }

    /// Cursor on a child of this node
    pub fn child(&mut self, segment: impl Into<PathSegment>) -> NodeCursor<'_> {
        NodeCursor {
            path: self.path.child(segment),
            root: &mut *self.root,
        }
    }

    /// Cursor on the parent node, `None` at the root
    pub fn parent(&mut self) -> Option<NodeCursor<'_>> {
        self.ancestor(1)
    }

    /// Cursor `levels` steps up, `None` past the root
    pub fn ancestor(&mut self, levels: usize) -> Option<NodeCursor<'_>> {
        let path = self.path.ancestor(levels)?;
        Some(NodeCursor {
            root: &mut *self.root,
            path,
        })
    }

    /// Cursor on any absolute path of the same tree
    pub fn at(&mut self, path: NodePath) -> NodeCursor<'_> {
        NodeCursor {
            root: &mut *self.root,
            path,
        }
    }

    /// Whole tree
    pub fn root(&self) -> &ConfigNode {
        &*self.root
    }
}
