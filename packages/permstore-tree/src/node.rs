//! Configuration tree nodes
//!
//! A [`ConfigNode`] is a scalar, an ordered sequence, or a keyed mapping.
//! Lookups return `Option`: `None` is a *virtual* node (nothing stored at that
//! path), which is distinct from a stored [`ConfigNode::Null`].

use std::collections::BTreeMap;

use crate::path::PathSegment;

/// A node in a configuration tree
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConfigNode {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Mapping(BTreeMap<String, ConfigNode>),
    Sequence(Vec<ConfigNode>),
}

impl ConfigNode {
    /// Empty mapping node
    pub fn mapping() -> Self {
        ConfigNode::Mapping(BTreeMap::new())
    }

    /// Empty sequence node
    pub fn sequence() -> Self {
        ConfigNode::Sequence(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigNode::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ConfigNode::Mapping(_) | ConfigNode::Sequence(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::String(value) => Some(value),
            _ => None,
        }
    }

    /// Boolean value; accepts the strings `true`/`false` as well
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigNode::Bool(value) => Some(*value),
            ConfigNode::String(value) => value.parse().ok(),
            _ => None,
        }
    }

    /// Integer value; accepts integral strings as well
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigNode::Int(value) => Some(*value),
            ConfigNode::String(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ConfigNode>> {
        match self {
            ConfigNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut BTreeMap<String, ConfigNode>> {
        match self {
            ConfigNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<ConfigNode>> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Render a scalar as a string (`None` for null, mappings and sequences)
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            ConfigNode::Bool(value) => Some(value.to_string()),
            ConfigNode::Int(value) => Some(value.to_string()),
            ConfigNode::Float(value) => Some(value.to_string()),
            ConfigNode::String(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Elements rendered as strings. A lone scalar counts as a one-element list.
    pub fn string_list(&self) -> Vec<String> {
        match self {
            ConfigNode::Sequence(items) => items.iter().filter_map(Self::scalar_string).collect(),
            other => other.scalar_string().into_iter().collect(),
        }
    }

    /// True for empty mappings and sequences
    pub fn is_empty_collection(&self) -> bool {
        match self {
            ConfigNode::Mapping(map) => map.is_empty(),
            ConfigNode::Sequence(items) => items.is_empty(),
            _ => false,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Path addressing
    // ═══════════════════════════════════════════════════════════════════════

    /// Direct child, `None` if virtual
    pub fn child(&self, segment: &PathSegment) -> Option<&ConfigNode> {
        match (self, segment) {
            (ConfigNode::Mapping(map), PathSegment::Key(key)) => map.get(key),
            (ConfigNode::Sequence(items), PathSegment::Index(index)) => items.get(*index),
            _ => None,
        }
    }

    pub fn child_mut(&mut self, segment: &PathSegment) -> Option<&mut ConfigNode> {
        match (self, segment) {
            (ConfigNode::Mapping(map), PathSegment::Key(key)) => map.get_mut(key),
            (ConfigNode::Sequence(items), PathSegment::Index(index)) => items.get_mut(*index),
            _ => None,
        }
    }

    /// Children in discovery order: mapping keys in key order, sequence items by index
    pub fn children(&self) -> Vec<(PathSegment, &ConfigNode)> {
        match self {
            ConfigNode::Mapping(map) => map
                .iter()
                .map(|(key, node)| (PathSegment::Key(key.clone()), node))
                .collect(),
            ConfigNode::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(index, node)| (PathSegment::Index(index), node))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Node at `path`, `None` if virtual
    pub fn get(&self, path: &[PathSegment]) -> Option<&ConfigNode> {
        path.iter().try_fold(self, |node, segment| node.child(segment))
    }

    pub fn get_mut(&mut self, path: &[PathSegment]) -> Option<&mut ConfigNode> {
        path.iter()
            .try_fold(self, |node, segment| node.child_mut(segment))
    }

    /// True when nothing is stored at `path`
    pub fn is_virtual(&self, path: &[PathSegment]) -> bool {
        self.get(path).is_none()
    }

    /// Node at `path`, created (as `Null`) along with any missing parents.
    ///
    /// A key segment turns a non-mapping parent into a mapping; an index
    /// segment turns a non-sequence parent into a sequence and pads it with
    /// `Null` up to the index.
    pub fn get_or_create(&mut self, path: &[PathSegment]) -> &mut ConfigNode {
        let mut node = self;
        for segment in path {
            node = match segment {
                PathSegment::Key(key) => {
                    if !matches!(node, ConfigNode::Mapping(_)) {
                        *node = ConfigNode::mapping();
                    }
                    match node {
                        ConfigNode::Mapping(map) => map.entry(key.clone()).or_default(),
                        _ => unreachable!("node was just replaced with a mapping"),
                    }
                }
                PathSegment::Index(index) => {
                    if !matches!(node, ConfigNode::Sequence(_)) {
                        *node = ConfigNode::sequence();
                    }
                    match node {
                        ConfigNode::Sequence(items) => {
                            if items.len() <= *index {
                                items.resize(*index + 1, ConfigNode::Null);
                            }
                            &mut items[*index]
                        }
                        _ => unreachable!("node was just replaced with a sequence"),
                    }
                }
            };
        }
        node
    }

    /// Store `value` at `path`, creating parents as needed
    pub fn set(&mut self, path: &[PathSegment], value: ConfigNode) {
        *self.get_or_create(path) = value;
    }

    /// Clear the node at `path`, returning what was stored there.
    ///
    /// Clearing the root resets it to `Null`.
    pub fn remove(&mut self, path: &[PathSegment]) -> Option<ConfigNode> {
        let Some((last, parent_path)) = path.split_last() else {
            return Some(std::mem::take(self));
        };
        match (self.get_mut(parent_path)?, last) {
            (ConfigNode::Mapping(map), PathSegment::Key(key)) => map.remove(key),
            (ConfigNode::Sequence(items), PathSegment::Index(index)) if *index < items.len() => {
                Some(items.remove(*index))
            }
            _ => None,
        }
    }

    /// Append `value` to the sequence at `path` and return its index.
    ///
    /// A virtual or `Null` node becomes an empty sequence first; any other
    /// non-sequence value becomes the first element of the new sequence.
    pub fn append(&mut self, path: &[PathSegment], value: ConfigNode) -> usize {
        let node = self.get_or_create(path);
        if node.is_null() {
            *node = ConfigNode::sequence();
        } else if !matches!(node, ConfigNode::Sequence(_)) {
            let existing = std::mem::take(node);
            *node = ConfigNode::Sequence(vec![existing]);
        }
        match node {
            ConfigNode::Sequence(items) => {
                items.push(value);
                items.len() - 1
            }
            _ => unreachable!("node was just converted to a sequence"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Scalar conversions
// ═══════════════════════════════════════════════════════════════════════════

impl From<bool> for ConfigNode {
    fn from(value: bool) -> Self {
        ConfigNode::Bool(value)
    }
}

impl From<i64> for ConfigNode {
    fn from(value: i64) -> Self {
        ConfigNode::Int(value)
    }
}

impl From<i32> for ConfigNode {
    fn from(value: i32) -> Self {
        ConfigNode::Int(value as i64)
    }
}

impl From<f64> for ConfigNode {
    fn from(value: f64) -> Self {
        ConfigNode::Float(value)
    }
}

impl From<&str> for ConfigNode {
    fn from(value: &str) -> Self {
        ConfigNode::String(value.to_string())
    }
}

impl From<String> for ConfigNode {
    fn from(value: String) -> Self {
        ConfigNode::String(value)
    }
}

impl<T: Into<ConfigNode>> From<Vec<T>> for ConfigNode {
    fn from(items: Vec<T>) -> Self {
        ConfigNode::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ConfigNode>> for ConfigNode {
    fn from(map: BTreeMap<String, ConfigNode>) -> Self {
        ConfigNode::Mapping(map)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// serde_yaml / serde_json bridges
// ═══════════════════════════════════════════════════════════════════════════

impl From<serde_yaml::Value> for ConfigNode {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => ConfigNode::Null,
            Value::Bool(b) => ConfigNode::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigNode::Int(i),
                None => ConfigNode::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => ConfigNode::String(s),
            Value::Sequence(items) => {
                ConfigNode::Sequence(items.into_iter().map(ConfigNode::from).collect())
            }
            Value::Mapping(map) => ConfigNode::Mapping(
                map.into_iter()
                    .map(|(key, value)| (yaml_key(key), ConfigNode::from(value)))
                    .collect(),
            ),
            Value::Tagged(tagged) => ConfigNode::from(tagged.value),
        }
    }
}

/// Mapping keys are strings in the tree; YAML allows any scalar
fn yaml_key(key: serde_yaml::Value) -> String {
    match ConfigNode::from(key) {
        ConfigNode::Null => "null".to_string(),
        scalar if scalar.is_scalar() => scalar.scalar_string().unwrap_or_default(),
        complex => serde_json::to_string(&complex.to_json_value()).unwrap_or_default(),
    }
}

impl From<serde_json::Value> for ConfigNode {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => ConfigNode::Null,
            Value::Bool(b) => ConfigNode::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigNode::Int(i),
                None => ConfigNode::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => ConfigNode::String(s),
            Value::Array(items) => {
                ConfigNode::Sequence(items.into_iter().map(ConfigNode::from).collect())
            }
            Value::Object(map) => ConfigNode::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, ConfigNode::from(value)))
                    .collect(),
            ),
        }
    }
}

impl ConfigNode {
    pub fn to_yaml_value(&self) -> serde_yaml::Value {
        use serde_yaml::Value;

        match self {
            ConfigNode::Null => Value::Null,
            ConfigNode::Bool(b) => Value::Bool(*b),
            ConfigNode::Int(i) => Value::Number((*i).into()),
            ConfigNode::Float(f) => Value::Number((*f).into()),
            ConfigNode::String(s) => Value::String(s.clone()),
            ConfigNode::Sequence(items) => {
                Value::Sequence(items.iter().map(Self::to_yaml_value).collect())
            }
            ConfigNode::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(key, node)| (Value::String(key.clone()), node.to_yaml_value()))
                    .collect(),
            ),
        }
    }

    /// JSON value; non-finite floats become `null`
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            ConfigNode::Null => Value::Null,
            ConfigNode::Bool(b) => Value::Bool(*b),
            ConfigNode::Int(i) => Value::Number((*i).into()),
            ConfigNode::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ConfigNode::String(s) => Value::String(s.clone()),
            ConfigNode::Sequence(items) => {
                Value::Array(items.iter().map(Self::to_json_value).collect())
            }
            ConfigNode::Mapping(map) => Value::Object(
                map.iter()
                    .map(|(key, node)| (key.clone(), node.to_json_value()))
                    .collect(),
            ),
        }
    }
}
