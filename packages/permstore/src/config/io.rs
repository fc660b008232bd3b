//! Configuration file I/O
//!
//! YAML only; a missing file is an empty configuration.

use std::path::Path;

use permstore_tree::{ConfigNode, FileFormat, TreeCodec};
use tracing::debug;

use super::PermissionsConfig;
use crate::error::{BackendError, BackendResult};

pub fn load_config(path: &Path) -> BackendResult<PermissionsConfig> {
    let node = if path.exists() {
        FileFormat::Yaml.load(path).map_err(|e| {
            BackendError::configuration(format!(
                "While loading configuration from {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?
    } else {
        debug!(path = %path.display(), "No configuration file, starting empty");
        ConfigNode::mapping()
    };
    Ok(PermissionsConfig::decode(&node)?)
}

pub fn save_config(path: &Path, config: &PermissionsConfig) -> BackendResult<()> {
    FileFormat::Yaml.save(path, &config.encode()).map_err(|e| {
        BackendError::storage(format!(
            "While saving configuration to {}: {}",
            path.display(),
            e
        ))
        .with_source(e)
    })
}
