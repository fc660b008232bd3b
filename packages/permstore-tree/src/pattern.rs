//! Wildcard path patterns
//!
//! A [`PathPattern`] is a fixed-length list of segments. `Any` matches a single
//! child at that depth; there is no recursive wildcard, so a pattern only
//! matches paths of exactly its own length.

use std::fmt;
use std::str::FromStr;

use crate::error::TreeError;
use crate::node::ConfigNode;
use crate::path::{NodePath, PathSegment};

/// One position of a [`PathPattern`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    /// Any single child
    Any,
    /// A mapping child with this key
    Key(String),
    /// A sequence child at this index
    Index(usize),
}

impl PatternSegment {
    pub fn matches(&self, segment: &PathSegment) -> bool {
        match (self, segment) {
            (PatternSegment::Any, _) => true,
            (PatternSegment::Key(expected), PathSegment::Key(actual)) => expected == actual,
            (PatternSegment::Index(expected), PathSegment::Index(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl From<&str> for PatternSegment {
    fn from(key: &str) -> Self {
        if key == "*" {
            PatternSegment::Any
        } else {
            PatternSegment::Key(key.to_string())
        }
    }
}

impl From<usize> for PatternSegment {
    fn from(index: usize) -> Self {
        PatternSegment::Index(index)
    }
}

impl fmt::Display for PatternSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSegment::Any => f.write_str("*"),
            PatternSegment::Key(key) => f.write_str(key),
            PatternSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Fixed-length path pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn new(segments: Vec<PatternSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `path` has the same length and every segment matches
    pub fn matches(&self, path: &[PathSegment]) -> bool {
        path.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(pattern, segment)| pattern.matches(segment))
    }

    /// Every existing node in `root` whose path matches, in discovery order
    /// (mapping keys sorted, sequence items by index).
    pub fn collect_matches(&self, root: &ConfigNode) -> Vec<NodePath> {
        let mut matches = Vec::new();
        let mut prefix = Vec::with_capacity(self.segments.len());
        self.walk(root, 0, &mut prefix, &mut matches);
        matches
    }

    fn walk(
        &self,
        node: &ConfigNode,
        depth: usize,
        prefix: &mut Vec<PathSegment>,
        out: &mut Vec<NodePath>,
    ) {
        let Some(pattern) = self.segments.get(depth) else {
            out.push(NodePath::from(prefix.as_slice()));
            return;
        };

        match pattern {
            PatternSegment::Any => {
                for (segment, child) in node.children() {
                    prefix.push(segment);
                    self.walk(child, depth + 1, prefix, out);
                    prefix.pop();
                }
            }
            PatternSegment::Key(key) => {
                let segment = PathSegment::Key(key.clone());
                if let Some(child) = node.child(&segment) {
                    prefix.push(segment);
                    self.walk(child, depth + 1, prefix, out);
                    prefix.pop();
                }
            }
            PatternSegment::Index(index) => {
                let segment = PathSegment::Index(*index);
                if let Some(child) = node.child(&segment) {
                    prefix.push(segment);
                    self.walk(child, depth + 1, prefix, out);
                    prefix.pop();
                }
            }
        }
    }
}

impl FromStr for PathPattern {
    type Err = TreeError;

    /// Parse a dotted pattern. `*` is a wildcard and all-digit segments are
    /// sequence indices. An empty string is the root pattern.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::new(Vec::new()));
        }

        let segments = s
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    return Err(TreeError::codec(s, "empty pattern segment"));
                }
                if part.bytes().all(|b| b.is_ascii_digit()) {
                    return part
                        .parse::<usize>()
                        .map(PatternSegment::Index)
                        .map_err(|e| TreeError::codec(s, e.to_string()));
                }
                Ok(PatternSegment::from(part))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(segments))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
