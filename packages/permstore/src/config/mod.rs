//! Service configuration
//!
//! The service configuration names a default backend and a map of backend
//! sections. Each section carries a `type` that selects its factory; the
//! remaining fields belong to that backend type.
//!
//! ```yaml
//! default-backend: main
//! backends:
//!   main: { type: multi, backends: [file, scratch] }
//!   file: { type: file, file: permissions.yml }
//!   scratch: { type: memory }
//! ```
//!
//! All sections are decoded with hand-written [`TreeCodec`] impls.

pub mod io;

use std::collections::BTreeMap;

use permstore_tree::codec::{optional_str, require_str, string_list};
use permstore_tree::{ConfigNode, NodePath, TreeCodec, TreeError, TreeResult};

pub use io::{load_config, save_config};

pub const TYPE_KEY: &str = "type";

/// Root of the service configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionsConfig {
    pub default_backend: Option<String>,
    /// Raw backend sections by identifier
    pub backends: BTreeMap<String, ConfigNode>,
}

impl PermissionsConfig {
    pub fn section(&self, identifier: &str) -> Option<&ConfigNode> {
        self.backends.get(identifier)
    }

    /// Value of the `type` field of a backend section
    pub fn backend_type(section: &ConfigNode) -> TreeResult<String> {
        require_str(section, TYPE_KEY)
    }
}

impl TreeCodec for PermissionsConfig {
    fn decode(node: &ConfigNode) -> TreeResult<Self> {
        let backends = match permstore_tree::codec::field(node, "backends")? {
            None | Some(ConfigNode::Null) => BTreeMap::new(),
            Some(ConfigNode::Mapping(map)) => map.clone(),
            Some(_) => return Err(TreeError::codec("backends", "expected a mapping")),
        };
        Ok(Self {
            default_backend: optional_str(node, "default-backend")?,
            backends,
        })
    }

    fn encode(&self) -> ConfigNode {
        let mut node = ConfigNode::mapping();
        if let Some(default_backend) = &self.default_backend {
            node.set(&NodePath::from(["default-backend"]), default_backend.as_str().into());
        }
        node.set(
            &NodePath::from(["backends"]),
            ConfigNode::Mapping(self.backends.clone()),
        );
        node
    }
}

/// Merge the encoded fields of `config` into `section`, keeping other keys
pub fn write_back<C: TreeCodec>(section: &mut ConfigNode, config: &C) {
    if let ConfigNode::Mapping(fields) = config.encode() {
        for (key, value) in fields {
            section.set(&NodePath::from([key.as_str()]), value);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Backend sections
// ═══════════════════════════════════════════════════════════════════════════

/// `type: file`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBackendConfig {
    /// Permissions file, relative to the provider's base directory
    pub file: String,
}

impl TreeCodec for FileBackendConfig {
    fn decode(node: &ConfigNode) -> TreeResult<Self> {
        Ok(Self {
            file: require_str(node, "file")?,
        })
    }

    fn encode(&self) -> ConfigNode {
        let mut node = ConfigNode::mapping();
        node.set(&NodePath::from(["file"]), self.file.as_str().into());
        node
    }
}

/// `type: multi`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiBackendConfig {
    /// Child identifiers in priority order; the first is the default write target
    pub backends: Vec<String>,
}

impl TreeCodec for MultiBackendConfig {
    fn decode(node: &ConfigNode) -> TreeResult<Self> {
        Ok(Self {
            backends: string_list(node, "backends")?,
        })
    }

    fn encode(&self) -> ConfigNode {
        let mut node = ConfigNode::mapping();
        node.set(&NodePath::from(["backends"]), self.backends.clone().into());
        node
    }
}

/// `type: memory`; no fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryBackendConfig;

impl TreeCodec for MemoryBackendConfig {
    fn decode(_node: &ConfigNode) -> TreeResult<Self> {
        Ok(Self)
    }

    fn encode(&self) -> ConfigNode {
        ConfigNode::mapping()
    }
}
