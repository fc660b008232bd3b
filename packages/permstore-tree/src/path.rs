//! Node paths
//!
//! A path is an ordered list of segments from the root: mapping keys or
//! sequence indices. Rendered dotted (`users.alice.0.permissions`) for logs.

use std::fmt;
use std::ops::Deref;

/// One step from a node to one of its children
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Child of a mapping
    Key(String),
    /// Child of a sequence
    Index(usize),
}

impl PathSegment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(key) => Some(key),
            PathSegment::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(index) => Some(*index),
            PathSegment::Key(_) => None,
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Absolute path of a node inside a tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    /// The root path (no segments)
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn into_segments(self) -> Vec<PathSegment> {
        self.0
    }

    /// Path of the parent node, `None` for the root
    pub fn parent(&self) -> Option<NodePath> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Path `levels` steps up, `None` when that walks past the root
    pub fn ancestor(&self, levels: usize) -> Option<NodePath> {
        if levels > self.0.len() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - levels].to_vec()))
    }

    /// Path of a child of this node
    pub fn child(&self, segment: impl Into<PathSegment>) -> NodePath {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// This path followed by `relative`
    pub fn join(&self, relative: &[PathSegment]) -> NodePath {
        let mut segments = self.0.clone();
        segments.extend_from_slice(relative);
        Self(segments)
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Same path with the final segment replaced
    pub fn with_last(&self, segment: impl Into<PathSegment>) -> NodePath {
        let mut segments = self.0.clone();
        match segments.last_mut() {
            Some(last) => *last = segment.into(),
            None => segments.push(segment.into()),
        }
        Self(segments)
    }
}

impl Deref for NodePath {
    type Target = [PathSegment];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<PathSegment>> for NodePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl From<&[PathSegment]> for NodePath {
    fn from(segments: &[PathSegment]) -> Self {
        Self(segments.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for NodePath {
    fn from(keys: [&str; N]) -> Self {
        Self(keys.iter().map(|key| PathSegment::from(*key)).collect())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
