//! Permissions file schema
//!
//! Migration chain applied to every permissions tree on load.
//!
//! | from | change                                                                  |
//! |------|-------------------------------------------------------------------------|
//! | ≤ 1  | `prefix`/`suffix`/`default` move under `options` (entity and per-world) |
//! | 2    | entities become segment lists, `worlds` flatten into `context.world` siblings, permission lists become boolean maps, `group`/`inheritance` become `parents` |
//!
//! A fully migrated tree carries `schema-version: 3`.

use std::collections::BTreeMap;

use permstore_tree::{
    actions, ConfigNode, NodeCursor, NodePath, PathPattern, PatternSegment, TransformAction,
    Transformation, VersionedTransformation,
};
use tracing::warn;

use super::legacy::convert_permission;

pub const SCHEMA_VERSION_KEY: &str = "schema-version";

/// Version written by [`permissions_schema`]
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

pub const PERMISSIONS_DEFAULT_KEY: &str = "permissions-default";

fn pattern(segments: &[&str]) -> PathPattern {
    PathPattern::new(segments.iter().map(|s| PatternSegment::from(*s)).collect())
}

/// The full versioned chain for permissions trees
pub fn permissions_schema() -> VersionedTransformation {
    let legacy_options = ["prefix", "suffix", "default"];

    VersionedTransformation::builder()
        .version_key(NodePath::from([SCHEMA_VERSION_KEY]))
        .add_version(
            1,
            Transformation::builder()
                .add_action(pattern(&["*", "*"]), actions::relocate(&legacy_options, "options"))
                .add_action(
                    pattern(&["*", "*", "worlds", "*"]),
                    actions::relocate(&legacy_options, "options"),
                )
                .build(),
        )
        .add_version(
            2,
            Transformation::chain(vec![
                Transformation::builder()
                    .add_action(pattern(&["*", "*"]), actions::wrap_in_sequence())
                    .build(),
                Transformation::builder()
                    .add_action(
                        PathPattern::new(vec![
                            PatternSegment::Any,
                            PatternSegment::Any,
                            PatternSegment::Index(0),
                            PatternSegment::from("worlds"),
                        ]),
                        actions::split_to_tagged_siblings(2, &["context", "world"]),
                    )
                    .build(),
                Transformation::builder()
                    .add_action(pattern(&["*", "*", "*", "permissions"]), PermissionListToTree)
                    .add_action(
                        pattern(&["users", "*", "*", "group"]),
                        actions::rename_terminal("parents"),
                    )
                    .add_action(
                        pattern(&["groups", "*", "*", "inheritance"]),
                        actions::rename_terminal("parents"),
                    )
                    .build(),
            ]),
        )
        .build()
}

/// Converts a legacy permission list into a boolean map.
///
/// A leading `-` negates; `*` sets `permissions-default` beside the list;
/// anything else is canonicalized with [`convert_permission`]. A list that
/// yields no entries is removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionListToTree;

impl TransformAction for PermissionListToTree {
    fn visit(&self, node: &mut NodeCursor<'_>) -> Option<NodePath> {
        let legacy = match node.get()? {
            ConfigNode::Sequence(_) | ConfigNode::String(_) => node.get()?.string_list(),
            _ => return None,
        };

        let mut converted = BTreeMap::new();
        let mut default = None;
        for entry in legacy {
            let (permission, value) = match entry.strip_prefix('-') {
                Some(rest) => (rest, false),
                None => (entry.as_str(), true),
            };
            if permission == "*" {
                default = Some(value);
                continue;
            }

            let canonical = convert_permission(permission);
            if canonical.contains('*') {
                warn!(
                    path = %node.path(),
                    permission = %canonical,
                    "Permission contains a now-illegal character '*'"
                );
            }
            converted.insert(canonical, ConfigNode::Bool(value));
        }

        if converted.is_empty() {
            node.clear();
        } else {
            node.set(ConfigNode::Mapping(converted));
        }
        if let Some(value) = default {
            node.parent()?.set_child(PERMISSIONS_DEFAULT_KEY, ConfigNode::Bool(value));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permstore_tree::FileFormat;
    use pretty_assertions::assert_eq;

    fn yaml(s: &str) -> ConfigNode {
        FileFormat::Yaml.parse(s).unwrap()
    }

    #[test]
    fn test_version_zero_relocates_options_at_every_depth() {
        let mut tree = yaml(
            r#"
schema-version: 0
users:
  alice:
    prefix: "[A]"
    suffix: "!"
    default: true
    worlds:
      nether:
        prefix: "[N]"
"#,
        );

        let outcome = permissions_schema().apply(&mut tree);
        assert_eq!((outcome.from, outcome.to), (0, CURRENT_SCHEMA_VERSION));

        assert_eq!(
            tree,
            yaml(
                r#"
schema-version: 3
users:
  alice:
    - options: {prefix: "[A]", suffix: "!", default: true}
    - options: {prefix: "[N]"}
      context: {world: nether}
"#
            )
        );
    }

    #[test]
    fn test_full_legacy_document() {
        let mut tree = yaml(
            r#"
users:
  alice:
    group: [admin]
    permissions: ["build.*", "-chat.(say|shout)", "*"]
    worlds:
      nether:
        permissions: ["-build"]
groups:
  admin:
    inheritance: [mod]
    permissions: ["-*"]
"#,
        );

        let outcome = permissions_schema().apply(&mut tree);
        assert_eq!(outcome.from, -1);
        assert!(outcome.changed());

        assert_eq!(
            tree,
            yaml(
                r#"
schema-version: 3
users:
  alice:
    - parents: [admin]
      permissions: {build: true, "chat.{say,shout}": false}
      permissions-default: true
    - permissions: {build: false}
      context: {world: nether}
groups:
  admin:
    - parents: [mod]
      permissions-default: false
"#
            )
        );
    }

    #[test]
    fn test_current_tree_is_untouched() {
        let mut tree = yaml(
            r#"
schema-version: 3
users:
  alice:
    - permissions: {build: true}
"#,
        );
        let before = tree.clone();

        let outcome = permissions_schema().apply(&mut tree);
        assert!(!outcome.changed());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_permission_map_is_left_alone() {
        let mut tree = yaml("users: {bob: [{permissions: {a: true}}]}");
        let transformation = Transformation::builder()
            .add_action(pattern(&["*", "*", "*", "permissions"]), PermissionListToTree)
            .build();
        let before = tree.clone();

        transformation.apply(&mut tree);
        assert_eq!(tree, before);
    }
}
