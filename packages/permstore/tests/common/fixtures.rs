//! Test fixtures
//!
//! Permission files in the shapes found in the wild, and helpers to lay
//! them out in a temporary directory.

use std::path::{Path, PathBuf};

use permstore::{PermissionsConfig, Qualifier, Qualifiers};
use permstore_tree::{FileFormat, TreeCodec};
use tempfile::TempDir;

/// Unversioned file: flat prefix, per-world permissions, string permission list
pub const SCHEMA_V0_YAML: &str = r#"
users:
  alice:
    prefix: "[Admin]"
    permissions:
      - "modifyworld.*"
      - "-worldedit.(wand|navigation)"
    worlds:
      nether:
        permissions:
          - "nether.enter"
groups:
  default:
    default: true
    permissions:
      - "chat.*"
"#;

/// Already at the current schema; loading must not rewrite it
pub const CURRENT_SCHEMA_JSON: &str = r#"{
  "schema-version": 3,
  "users": {
    "bob": [
      {
        "permissions": { "build": true },
        "options": { "prefix": "[B]" }
      }
    ]
  }
}"#;

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

/// Write `contents` to `dir/name`, returning the full path
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

pub fn config_from_yaml(yaml: &str) -> PermissionsConfig {
    let node = FileFormat::Yaml.parse(yaml).expect("parse config fixture");
    PermissionsConfig::decode(&node).expect("decode config fixture")
}

pub fn user(name: &str) -> Qualifiers {
    Qualifiers::new().with(Qualifier::User, name)
}

pub fn group(name: &str) -> Qualifiers {
    Qualifiers::new().with(Qualifier::Group, name)
}
