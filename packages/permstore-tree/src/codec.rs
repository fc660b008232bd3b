//! Struct-to-tree codecs
//!
//! Configuration structs implement [`TreeCodec`] by hand: decode reads the
//! fields it knows from a [`ConfigNode`], encode writes them back. The helper
//! functions below cover the field shapes configuration sections use.

use crate::error::{TreeError, TreeResult};
use crate::node::ConfigNode;

/// Explicit conversion between a typed value and a configuration node
pub trait TreeCodec: Sized {
    fn decode(node: &ConfigNode) -> TreeResult<Self>;

    fn encode(&self) -> ConfigNode;
}

/// Required string field
pub fn require_str(node: &ConfigNode, key: &str) -> TreeResult<String> {
    optional_str(node, key)?.ok_or_else(|| TreeError::codec(key, "missing required field"))
}

/// Optional string field; numbers and booleans are accepted as their text
pub fn optional_str(node: &ConfigNode, key: &str) -> TreeResult<Option<String>> {
    match field(node, key)? {
        None | Some(ConfigNode::Null) => Ok(None),
        Some(value) => value
            .scalar_string()
            .map(Some)
            .ok_or_else(|| TreeError::codec(key, "expected a scalar")),
    }
}

/// List of strings; a lone scalar is read as a one-element list
pub fn string_list(node: &ConfigNode, key: &str) -> TreeResult<Vec<String>> {
    match field(node, key)? {
        None | Some(ConfigNode::Null) => Ok(Vec::new()),
        Some(ConfigNode::Mapping(_)) => Err(TreeError::codec(key, "expected a list of strings")),
        Some(value) => Ok(value.string_list()),
    }
}

/// Child of a mapping. Decoding from `Null` is treated as an empty mapping.
pub fn field<'a>(node: &'a ConfigNode, key: &str) -> TreeResult<Option<&'a ConfigNode>> {
    match node {
        ConfigNode::Mapping(map) => Ok(map.get(key)),
        ConfigNode::Null => Ok(None),
        _ => Err(TreeError::codec(key, "parent is not a mapping")),
    }
}
