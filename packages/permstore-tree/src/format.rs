//! File formats
//!
//! YAML is the legacy permissions format and the service configuration
//! format; JSON is the current permissions format. The format is chosen by
//! file extension.

use std::fs;
use std::path::Path;

use crate::error::{TreeError, TreeResult};
use crate::node::ConfigNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Format for `path`, by extension (`.yml`/`.yaml`/`.json`)
    pub fn from_path(path: &Path) -> TreeResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "yml" | "yaml" => Ok(FileFormat::Yaml),
            "json" => Ok(FileFormat::Json),
            other => Err(TreeError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Yaml => "yml",
            FileFormat::Json => "json",
        }
    }

    /// Parse a document; blank input is an empty mapping
    pub fn parse(&self, content: &str) -> TreeResult<ConfigNode> {
        if content.trim().is_empty() {
            return Ok(ConfigNode::mapping());
        }
        let node = match self {
            FileFormat::Yaml => ConfigNode::from(serde_yaml::from_str::<serde_yaml::Value>(content)?),
            FileFormat::Json => ConfigNode::from(serde_json::from_str::<serde_json::Value>(content)?),
        };
        Ok(match node {
            ConfigNode::Null => ConfigNode::mapping(),
            node => node,
        })
    }

    pub fn render(&self, node: &ConfigNode) -> TreeResult<String> {
        Ok(match self {
            FileFormat::Yaml => serde_yaml::to_string(&node.to_yaml_value())?,
            FileFormat::Json => serde_json::to_string_pretty(&node.to_json_value())?,
        })
    }

    /// Read and parse `path`
    pub fn load(&self, path: &Path) -> TreeResult<ConfigNode> {
        let content = fs::read_to_string(path)?;
        self.parse(&content)
    }

    /// Render and write `node` to `path`
    pub fn save(&self, path: &Path, node: &ConfigNode) -> TreeResult<()> {
        let content = self.render(node)?;
        fs::write(path, content)?;
        Ok(())
    }
}
