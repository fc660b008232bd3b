//! FileBackend integration tests
//!
//! Schema migration on load, legacy file conversion through the provider and
//! failed-reload behavior, all against real files in a temp directory.

mod common;

use std::collections::BTreeMap;

use common::*;
use permstore::backend::infrastructure::LEGACY_BACKUP_SUFFIX;
use permstore::config::FileBackendConfig;
use permstore::migration::CURRENT_SCHEMA_VERSION;
use permstore::{
    BackendProvider, Context, Entries, ErrorKind, EventBus, FileBackend, MatcherGroup,
    PermissionBackend, Qualifier,
};
use permstore_tree::{FileFormat, NodePath, TreeCodec};
use pretty_assertions::assert_eq;

fn map(pairs: &[(&str, &str)]) -> Entries {
    Entries::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Schema migration
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_unversioned_file_is_migrated_to_current_schema() {
    let dir = temp_dir();
    write_file(
        dir.path(),
        "permissions.json",
        &FileFormat::Json
            .render(&FileFormat::Yaml.parse(SCHEMA_V0_YAML).unwrap())
            .unwrap(),
    );
    let mut config = FileBackendConfig {
        file: "permissions.json".into(),
    };

    let backend = FileBackend::open("file", &mut config, dir.path(), EventBus::new())
        .await
        .unwrap();

    assert_eq!(backend.schema_version(), CURRENT_SCHEMA_VERSION);

    let stored = FileFormat::Json.load(backend.path()).unwrap();
    let expected = FileFormat::Yaml
        .parse(
            r#"
schema-version: 3
users:
  alice:
    - options: { prefix: "[Admin]" }
      permissions: { modifyworld: true, "worldedit.{wand,navigation}": false }
    - context: { world: nether }
      permissions: { nether.enter: true }
groups:
  default:
    - options: { default: true }
      permissions: { chat: true }
"#,
        )
        .unwrap();
    assert_eq!(
        stored.get(&NodePath::from(["users"])),
        expected.get(&NodePath::from(["users"]))
    );
    assert_eq!(
        stored.get(&NodePath::from(["groups"])),
        expected.get(&NodePath::from(["groups"]))
    );

    let permissions = backend
        .get_matching_groups(MatcherGroup::PERMISSIONS, None)
        .await
        .unwrap();
    assert_eq!(permissions.len(), 3);
    assert_eq!(
        permissions[0].entries(),
        &map(&[("modifyworld", "true"), ("worldedit.{wand,navigation}", "false")])
    );

    let in_nether = Context::new()
        .with(Qualifier::User, "alice")
        .with(Qualifier::World, "nether");
    let nether_only: Vec<_> = backend
        .get_matching_groups(MatcherGroup::PERMISSIONS, Some(&in_nether))
        .await
        .unwrap()
        .into_iter()
        .filter(|group| group.qualifiers().contains_key(Qualifier::World))
        .collect();
    assert_eq!(nether_only.len(), 1);
    assert_eq!(nether_only[0].entries(), &map(&[("nether.enter", "true")]));

    let options = backend
        .get_matching_groups(MatcherGroup::OPTIONS, None)
        .await
        .unwrap();
    assert_qualifier_order(&options, Qualifier::User, &["alice", "<none>"]);
    assert_eq!(options[1].entries(), &map(&[("default", "true")]));
}

#[tokio::test]
async fn test_current_file_is_not_rewritten() {
    let dir = temp_dir();
    let path = write_file(dir.path(), "permissions.json", CURRENT_SCHEMA_JSON);
    let mut config = FileBackendConfig {
        file: "permissions.json".into(),
    };

    let backend = FileBackend::open("file", &mut config, dir.path(), EventBus::new())
        .await
        .unwrap();
    backend.reload().await.unwrap();

    // byte-for-byte: a rewrite would re-render the JSON
    assert_eq!(std::fs::read_to_string(&path).unwrap(), CURRENT_SCHEMA_JSON);
    assert_eq!(backend.schema_version(), CURRENT_SCHEMA_VERSION);
    assert_eq!(backend.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_set_schema_version_persists() {
    let dir = temp_dir();
    write_file(dir.path(), "permissions.json", CURRENT_SCHEMA_JSON);
    let mut config = FileBackendConfig {
        file: "permissions.json".into(),
    };
    let backend = FileBackend::open("file", &mut config, dir.path(), EventBus::new())
        .await
        .unwrap();

    backend.set_schema_version(7).await.unwrap();

    assert_eq!(backend.schema_version(), 7);
    let stored = FileFormat::Json.load(backend.path()).unwrap();
    assert_eq!(
        stored.get(&NodePath::from(["schema-version"])).and_then(|n| n.as_i64()),
        Some(7)
    );
}

// ════════════════════════════════════════════════════════════════════════════
// Legacy files
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_legacy_yaml_is_converted_backed_up_and_config_rewritten() {
    let dir = temp_dir();
    let legacy = write_file(dir.path(), "permissions.yml", SCHEMA_V0_YAML);
    let provider = BackendProvider::new(
        config_from_yaml("backends: { file: { type: file, file: permissions.yml } }"),
        dir.path(),
    );

    let backend = provider.create_backend("file").await.unwrap();

    assert!(!legacy.exists());
    let mut backup = legacy.clone().into_os_string();
    backup.push(LEGACY_BACKUP_SUFFIX);
    assert!(std::path::Path::new(&backup).exists());
    assert!(dir.path().join("permissions.json").exists());

    let config = provider.config();
    let section = FileBackendConfig::decode(config.section("file").unwrap()).unwrap();
    assert_eq!(section.file, "permissions.json");

    assert!(backend.has_any_qualifier(Qualifier::User, "alice").await.unwrap());
    assert_eq!(backend.schema_version(), CURRENT_SCHEMA_VERSION);
}

// ════════════════════════════════════════════════════════════════════════════
// Failure handling
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_failed_reload_makes_reads_fail_until_recovered() {
    let dir = temp_dir();
    let path = write_file(dir.path(), "permissions.json", CURRENT_SCHEMA_JSON);
    let mut config = FileBackendConfig {
        file: "permissions.json".into(),
    };
    let backend = FileBackend::open("file", &mut config, dir.path(), EventBus::new())
        .await
        .unwrap();
    assert!(backend.has_any_qualifier(Qualifier::User, "bob").await.unwrap());

    std::fs::write(&path, "{ not json").unwrap();
    let err = backend.reload().await.unwrap_err();
    assert_error_kind(&err, ErrorKind::Load);

    let read = backend.get_all().await.unwrap_err();
    assert_error_kind(&read, ErrorKind::Load);
    assert!(backend
        .create_matcher_group(MatcherGroup::OPTIONS, Entries::Map(BTreeMap::new()), user("bob"))
        .await
        .is_err());

    std::fs::write(&path, CURRENT_SCHEMA_JSON).unwrap();
    backend.reload().await.unwrap();
    assert!(backend.has_any_qualifier(Qualifier::User, "bob").await.unwrap());
}

#[tokio::test]
async fn test_created_groups_are_published() {
    let dir = temp_dir();
    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let mut config = FileBackendConfig {
        file: "permissions.json".into(),
    };
    let backend = FileBackend::open("file", &mut config, dir.path(), bus)
        .await
        .unwrap();

    let created = backend
        .create_matcher_group(
            MatcherGroup::OPTIONS,
            map(&[("prefix", "[M]")]),
            group("mods"),
        )
        .await
        .unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.backend, "file");
    assert!(event.old.is_none());
    assert_eq!(event.new.as_deref(), Some(created.as_ref()));
}
