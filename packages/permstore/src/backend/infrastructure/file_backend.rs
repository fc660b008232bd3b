//! File Permission Backend
//!
//! Stores every matcher group in one JSON permissions file:
//!
//! ```text
//! schema-version: 3
//! users:                      # entity type -> qualifier `user`
//!   alice:                    # entity name
//!     - permissions: {build: true, chat: false}
//!       permissions-default: false
//!       options: {prefix: "[A]"}
//!       parents: [admin]
//!     - context: {world: nether}   # extra qualifiers of this segment
//!       permissions: {build: false}
//! groups:                     # entity type -> qualifier `group`
//!   admin: [...]
//! ```
//!
//! Each segment yields up to three matcher groups (`permissions`, `options`,
//! `inheritance`), tagged with the subject qualifier plus one qualifier per
//! `context` entry.
//!
//! Loading converts legacy YAML files, then runs the permissions schema
//! migration and saves the file when the version advanced. Mutations persist
//! the new tree before swapping in-memory state, under the state write lock.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use permstore_tree::{ConfigNode, FileFormat, NodePath, PathSegment, VersionedTransformation};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::domain::{
    query, EventAction, EventBus, Entries, MatcherGroup, MatcherGroupEvent, PermissionBackend,
    NO_SCHEMA,
};
use crate::config::FileBackendConfig;
use crate::error::{BackendError, BackendResult};
use crate::migration::schema::{permissions_schema, PERMISSIONS_DEFAULT_KEY, SCHEMA_VERSION_KEY};
use crate::qualifier::{Context, Qualifier, Qualifiers};

/// Suffix appended to a converted legacy file
pub const LEGACY_BACKUP_SUFFIX: &str = ".legacy-backup";

const CONTEXT_KEY: &str = "context";
const OPTIONS_KEY: &str = "options";
const PARENTS_KEY: &str = "parents";

/// Entity types stored in the file and the subject qualifier of each
const ENTITY_TYPES: [(&str, Qualifier); 2] = [("users", Qualifier::User), ("groups", Qualifier::Group)];

fn entity_type_for(subject: Qualifier) -> Option<&'static str> {
    ENTITY_TYPES
        .iter()
        .find(|(_, qualifier)| *qualifier == subject)
        .map(|(name, _)| *name)
}

enum FileState {
    Loaded {
        tree: ConfigNode,
        groups: Vec<Arc<MatcherGroup>>,
    },
    /// Last load failed; reads report this instead of serving stale data
    Failed(String),
}

pub struct FileBackend {
    identifier: String,
    path: PathBuf,
    migration: VersionedTransformation,
    state: RwLock<FileState>,
    schema_version: AtomicI32,
    events: EventBus,
}

impl FileBackend {
    /// Open the permissions file named by `config`, relative to `base_dir`.
    ///
    /// A legacy YAML file is converted first and `config.file` is rewritten to
    /// the new file name.
    pub async fn open(
        identifier: impl Into<String>,
        config: &mut FileBackendConfig,
        base_dir: &Path,
        events: EventBus,
    ) -> BackendResult<Self> {
        let identifier = identifier.into();
        let path = convert_legacy_file(config, base_dir).await?;

        let backend = Self {
            identifier,
            path,
            migration: permissions_schema(),
            state: RwLock::new(FileState::Failed("not loaded".to_string())),
            schema_version: AtomicI32::new(NO_SCHEMA),
            events,
        };
        backend.reload().await?;
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, migrate and index the permissions file
    async fn load(&self) -> BackendResult<(ConfigNode, Vec<Arc<MatcherGroup>>)> {
        let mut tree = read_tree(&self.path).await?;

        let outcome = self.migration.apply(&mut tree);
        if outcome.changed() {
            info!(
                backend = %self.identifier,
                path = %self.path.display(),
                from = outcome.from,
                to = outcome.to,
                "Permissions schema version updated"
            );
            write_tree(&self.path, &tree).await?;
        }

        let groups = derive_groups(&tree).into_iter().map(Arc::new).collect();
        Ok((tree, groups))
    }

    /// Persist `tree` and swap it in together with `groups`
    async fn commit(
        &self,
        state: &mut FileState,
        tree: ConfigNode,
        groups: Vec<Arc<MatcherGroup>>,
    ) -> BackendResult<()> {
        write_tree(&self.path, &tree).await?;
        self.schema_version
            .store(stored_schema_version(&tree), Ordering::SeqCst);
        *state = FileState::Loaded { tree, groups };
        Ok(())
    }

    fn loaded<'a>(&self, state: &'a FileState) -> BackendResult<(&'a ConfigNode, &'a [Arc<MatcherGroup>])> {
        match state {
            FileState::Loaded { tree, groups } => Ok((tree, groups.as_slice())),
            FileState::Failed(reason) => Err(BackendError::load(format!(
                "Backend '{}' is unavailable: {}",
                self.identifier, reason
            ))),
        }
    }

    async fn read_groups<T>(&self, f: impl FnOnce(&[Arc<MatcherGroup>]) -> T) -> BackendResult<T> {
        let state = self.state.read().await;
        let (_, groups) = self.loaded(&state)?;
        Ok(f(groups))
    }
}

#[async_trait]
impl PermissionBackend for FileBackend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn reload(&self) -> BackendResult<()> {
        let mut state = self.state.write().await;
        match self.load().await {
            Ok((tree, groups)) => {
                debug!(backend = %self.identifier, groups = groups.len(), "Loaded permissions file");
                self.schema_version
                    .store(stored_schema_version(&tree), Ordering::SeqCst);
                *state = FileState::Loaded { tree, groups };
                Ok(())
            }
            Err(err) => {
                warn!(backend = %self.identifier, error = %err, "Failed to load permissions file");
                *state = FileState::Failed(err.to_string());
                self.schema_version.store(NO_SCHEMA, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    async fn user_names(&self) -> BackendResult<HashSet<String>> {
        self.read_groups(query::user_names).await
    }

    async fn get_all(&self) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        self.read_groups(|groups| groups.to_vec()).await
    }

    async fn get_matching_groups(
        &self,
        group_type: &str,
        context: Option<&Context>,
    ) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        self.read_groups(|groups| query::matching_groups(groups, group_type, context))
            .await
    }

    async fn get_all_values(&self, qualifier: Qualifier) -> BackendResult<BTreeSet<String>> {
        self.read_groups(|groups| query::all_values(groups, qualifier)).await
    }

    async fn has_any_qualifier(&self, qualifier: Qualifier, value: &str) -> BackendResult<bool> {
        self.read_groups(|groups| query::has_any(groups, qualifier, value))
            .await
    }

    async fn all_with_qualifier(&self, qualifier: Qualifier) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        self.read_groups(|groups| query::all_with(groups, qualifier)).await
    }

    async fn create_matcher_group(
        &self,
        group_type: &str,
        entries: Entries,
        qualifiers: Qualifiers,
    ) -> BackendResult<Arc<MatcherGroup>> {
        let (subject, name) = subject_of(&qualifiers)?;
        let entity_type = entity_type_for(subject)
            .ok_or_else(|| BackendError::invalid_group(format!("No entity type for {}", subject)))?;
        let segment = encode_segment(group_type, &entries, &qualifiers)?;

        let mut state = self.state.write().await;
        let (tree, groups) = self.loaded(&state)?;

        let created = segment_groups(subject, &name, &segment)
            .into_iter()
            .next()
            .map(Arc::new)
            .ok_or_else(|| BackendError::invalid_group("Group has no entries to store"))?;

        let mut new_tree = tree.clone();
        new_tree.append(&NodePath::from([entity_type, name.as_str()]), segment);
        let mut new_groups = groups.to_vec();
        new_groups.push(created.clone());

        self.commit(&mut state, new_tree, new_groups).await?;
        drop(state);

        debug!(backend = %self.identifier, group_type, subject = %name, "Created matcher group");
        self.call_event(None, Some(created.clone()), EventAction::Create);
        Ok(created)
    }

    async fn replace_qualifier(&self, qualifier: Qualifier, old: &str, new: &str) -> BackendResult<()> {
        if qualifier == Qualifier::Backend || old == new {
            return Ok(());
        }

        let mut state = self.state.write().await;
        let (tree, groups) = self.loaded(&state)?;

        let mut new_tree = tree.clone();
        let rewritten = match entity_type_for(qualifier) {
            Some(entity_type) => rename_entity(&mut new_tree, entity_type, old, new),
            None => rewrite_context_values(&mut new_tree, qualifier, old, new),
        };
        if !rewritten {
            return Ok(());
        }

        let mut changed = Vec::new();
        let new_groups = groups
            .iter()
            .map(|group| match group.with_replaced_qualifier(qualifier, old, new) {
                Some(replaced) => {
                    let replaced = Arc::new(replaced);
                    changed.push((group.clone(), replaced.clone()));
                    replaced
                }
                None => group.clone(),
            })
            .collect();

        self.commit(&mut state, new_tree, new_groups).await?;
        drop(state);

        for (previous, replaced) in changed {
            self.call_event(Some(previous), Some(replaced), EventAction::Update);
        }
        Ok(())
    }

    fn call_event(
        &self,
        old: Option<Arc<MatcherGroup>>,
        new: Option<Arc<MatcherGroup>>,
        action: EventAction,
    ) {
        self.events.publish(MatcherGroupEvent {
            backend: self.identifier.clone(),
            action,
            old,
            new,
        });
    }

    fn schema_version(&self) -> i32 {
        self.schema_version.load(Ordering::SeqCst)
    }

    async fn set_schema_version(&self, version: i32) -> BackendResult<()> {
        let mut state = self.state.write().await;
        let (tree, groups) = self.loaded(&state)?;

        let mut new_tree = tree.clone();
        new_tree.set(
            &NodePath::from([SCHEMA_VERSION_KEY]),
            ConfigNode::Int(i64::from(version)),
        );
        let groups = groups.to_vec();
        self.commit(&mut state, new_tree, groups).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// File handling
// ═══════════════════════════════════════════════════════════════════════════

/// Convert a legacy YAML permissions file to JSON and return the current path.
///
/// The YAML file is renamed with [`LEGACY_BACKUP_SUFFIX`] and `config.file`
/// points at the new JSON file afterwards.
async fn convert_legacy_file(config: &mut FileBackendConfig, base_dir: &Path) -> BackendResult<PathBuf> {
    let configured = base_dir.join(&config.file);
    let format = FileFormat::from_path(&configured)?;
    if format != FileFormat::Yaml {
        return Ok(configured);
    }

    let converted_name = Path::new(&config.file)
        .with_extension(FileFormat::Json.extension())
        .to_string_lossy()
        .into_owned();
    let converted = base_dir.join(&converted_name);

    if tokio::fs::try_exists(&configured).await? {
        let content = tokio::fs::read_to_string(&configured).await.map_err(|e| {
            BackendError::load(format!(
                "While loading legacy YAML permissions from {}",
                configured.display()
            ))
            .with_source(e)
        })?;
        let tree = FileFormat::Yaml.parse(&content)?;
        write_tree(&converted, &tree).await?;

        let mut backup = configured.clone().into_os_string();
        backup.push(LEGACY_BACKUP_SUFFIX);
        tokio::fs::rename(&configured, &backup).await?;
        info!(
            from = %configured.display(),
            to = %converted.display(),
            "Converted legacy permissions file"
        );
    }

    config.file = converted_name;
    Ok(converted)
}

async fn read_tree(path: &Path) -> BackendResult<ConfigNode> {
    if !tokio::fs::try_exists(path).await? {
        debug!(path = %path.display(), "Permissions file missing, starting empty");
        return Ok(ConfigNode::mapping());
    }
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        BackendError::load(format!("While loading permissions file from {}", path.display()))
            .with_source(e)
    })?;
    FileFormat::from_path(path)?.parse(&content).map_err(|e| {
        BackendError::load(format!(
            "While loading permissions file from {}: {}",
            path.display(),
            e
        ))
        .with_source(e)
    })
}

async fn write_tree(path: &Path, tree: &ConfigNode) -> BackendResult<()> {
    let content = FileFormat::Json.render(tree)?;
    tokio::fs::write(path, content).await.map_err(|e| {
        BackendError::storage(format!("While saving permissions file to {}", path.display()))
            .with_source(e)
    })
}

fn stored_schema_version(tree: &ConfigNode) -> i32 {
    tree.get(&NodePath::from([SCHEMA_VERSION_KEY]))
        .and_then(ConfigNode::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(NO_SCHEMA)
}

// ═══════════════════════════════════════════════════════════════════════════
// Tree <-> matcher groups
// ═══════════════════════════════════════════════════════════════════════════

fn derive_groups(tree: &ConfigNode) -> Vec<MatcherGroup> {
    let mut groups = Vec::new();
    for (entity_type, subject) in ENTITY_TYPES {
        let Some(entities) = tree.child(&PathSegment::from(entity_type)).and_then(ConfigNode::as_mapping) else {
            continue;
        };
        for (name, segments) in entities {
            match segments {
                ConfigNode::Sequence(items) => {
                    for segment in items {
                        groups.extend(segment_groups(subject, name, segment));
                    }
                }
                segment => groups.extend(segment_groups(subject, name, segment)),
            }
        }
    }
    groups
}

/// Matcher groups stored in one segment, in `permissions`, `options`,
/// `inheritance` order
fn segment_groups(subject: Qualifier, name: &str, segment: &ConfigNode) -> Vec<MatcherGroup> {
    let Some(fields) = segment.as_mapping() else {
        return Vec::new();
    };

    let mut qualifiers = Qualifiers::new().with(subject, name);
    if let Some(context) = fields.get(CONTEXT_KEY).and_then(ConfigNode::as_mapping) {
        for (key, values) in context {
            match Qualifier::by_name(key) {
                Some(qualifier) => {
                    for value in values.string_list() {
                        qualifiers.insert(qualifier, value);
                    }
                }
                None => warn!(subject = name, qualifier = %key, "Ignoring unknown context qualifier"),
            }
        }
    }

    let mut groups = Vec::new();

    let permissions = fields.get(MatcherGroup::PERMISSIONS).and_then(ConfigNode::as_mapping);
    let default = fields.get(PERMISSIONS_DEFAULT_KEY).and_then(ConfigNode::as_bool);
    if permissions.is_some() || default.is_some() {
        let mut entries: BTreeMap<String, String> = permissions
            .into_iter()
            .flatten()
            .filter_map(|(permission, value)| value.as_bool().map(|v| (permission.clone(), v.to_string())))
            .collect();
        if let Some(default) = default {
            entries.insert("*".to_string(), default.to_string());
        }
        groups.push(MatcherGroup::new(
            MatcherGroup::PERMISSIONS,
            Entries::Map(entries),
            qualifiers.clone(),
        ));
    }

    if let Some(options) = fields.get(OPTIONS_KEY).and_then(ConfigNode::as_mapping) {
        let entries = options
            .iter()
            .filter_map(|(key, value)| value.scalar_string().map(|v| (key.clone(), v)))
            .collect();
        groups.push(MatcherGroup::new(
            MatcherGroup::OPTIONS,
            Entries::Map(entries),
            qualifiers.clone(),
        ));
    }

    if let Some(parents) = fields.get(PARENTS_KEY) {
        groups.push(MatcherGroup::new(
            MatcherGroup::INHERITANCE,
            Entries::List(parents.string_list()),
            qualifiers,
        ));
    }

    groups
}

/// The single `user` or `group` value a stored group must carry
fn subject_of(qualifiers: &Qualifiers) -> BackendResult<(Qualifier, String)> {
    let subjects: Vec<(Qualifier, &str)> = qualifiers
        .iter()
        .filter(|(qualifier, _)| entity_type_for(*qualifier).is_some())
        .collect();

    match subjects.as_slice() {
        [(qualifier, name)] => Ok((*qualifier, name.to_string())),
        [] => Err(BackendError::invalid_group(
            "File backend groups need a user or group qualifier",
        )),
        _ => Err(BackendError::invalid_group(
            "File backend groups need exactly one user or group qualifier",
        )),
    }
}

/// Tree segment holding one group
fn encode_segment(group_type: &str, entries: &Entries, qualifiers: &Qualifiers) -> BackendResult<ConfigNode> {
    let mut segment = ConfigNode::mapping();

    for qualifier in qualifiers.keys() {
        if qualifier == Qualifier::Backend || entity_type_for(qualifier).is_some() {
            continue;
        }
        let values: Vec<&str> = qualifiers
            .get(qualifier)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        let node = match values.as_slice() {
            [single] => ConfigNode::from(*single),
            many => ConfigNode::from(many.to_vec()),
        };
        segment.set(&NodePath::from([CONTEXT_KEY, qualifier.name()]), node);
    }

    match (group_type, entries) {
        (MatcherGroup::PERMISSIONS, entries) => {
            let mut permissions = BTreeMap::new();
            let mut default = None;
            let pairs: Vec<(String, bool)> = match entries {
                Entries::Map(map) => map
                    .iter()
                    .map(|(permission, value)| {
                        value
                            .trim()
                            .parse::<bool>()
                            .map(|v| (permission.clone(), v))
                            .map_err(|_| {
                                BackendError::invalid_group(format!(
                                    "Permission '{}' has non-boolean value '{}'",
                                    permission, value
                                ))
                            })
                    })
                    .collect::<BackendResult<_>>()?,
                Entries::List(items) => items
                    .iter()
                    .map(|item| match item.strip_prefix('-') {
                        Some(rest) => (rest.to_string(), false),
                        None => (item.clone(), true),
                    })
                    .collect(),
            };
            for (permission, value) in pairs {
                if permission == "*" {
                    default = Some(value);
                } else {
                    permissions.insert(permission, ConfigNode::Bool(value));
                }
            }
            segment.set(
                &NodePath::from([MatcherGroup::PERMISSIONS]),
                ConfigNode::Mapping(permissions),
            );
            if let Some(default) = default {
                segment.set(&NodePath::from([PERMISSIONS_DEFAULT_KEY]), ConfigNode::Bool(default));
            }
        }
        (MatcherGroup::OPTIONS, Entries::Map(map)) => {
            let options = map
                .iter()
                .map(|(key, value)| (key.clone(), ConfigNode::from(value.as_str())))
                .collect();
            segment.set(&NodePath::from([OPTIONS_KEY]), ConfigNode::Mapping(options));
        }
        (MatcherGroup::INHERITANCE, Entries::List(parents)) => {
            segment.set(&NodePath::from([PARENTS_KEY]), parents.clone().into());
        }
        (MatcherGroup::OPTIONS, Entries::List(_)) | (MatcherGroup::INHERITANCE, Entries::Map(_)) => {
            return Err(BackendError::invalid_group(format!(
                "Wrong entry shape for '{}' group",
                group_type
            )));
        }
        (other, _) => {
            return Err(BackendError::invalid_group(format!(
                "File backend cannot store '{}' groups",
                other
            )));
        }
    }

    Ok(segment)
}

/// Move `entity_type.old` to `entity_type.new`, appending to any existing
/// segments of `new`. Returns false when `old` does not exist.
fn rename_entity(tree: &mut ConfigNode, entity_type: &str, old: &str, new: &str) -> bool {
    let Some(segments) = tree.remove(&NodePath::from([entity_type, old])) else {
        return false;
    };
    let target = NodePath::from([entity_type, new]);
    match segments {
        ConfigNode::Sequence(items) => {
            for item in items {
                tree.append(&target, item);
            }
        }
        other => {
            tree.append(&target, other);
        }
    }
    true
}

/// Rewrite `context.<qualifier>` values in every segment, whether the entity
/// is stored as a segment list or as a single mapping. Returns true if any changed.
fn rewrite_context_values(tree: &mut ConfigNode, qualifier: Qualifier, old: &str, new: &str) -> bool {
    let mut changed = false;
    for (entity_type, _) in ENTITY_TYPES {
        let Some(entities) = tree
            .get_mut(&[PathSegment::from(entity_type)])
            .and_then(ConfigNode::as_mapping_mut)
        else {
            continue;
        };
        for segments in entities.values_mut() {
            match segments {
                ConfigNode::Sequence(items) => {
                    for segment in items {
                        changed |= rewrite_segment_context(segment, qualifier, old, new);
                    }
                }
                segment => changed |= rewrite_segment_context(segment, qualifier, old, new),
            }
        }
    }
    changed
}

fn rewrite_segment_context(segment: &mut ConfigNode, qualifier: Qualifier, old: &str, new: &str) -> bool {
    let path = NodePath::from([CONTEXT_KEY, qualifier.name()]);
    let Some(values) = segment.get_mut(&path) else {
        return false;
    };
    match values {
        ConfigNode::Sequence(list) => {
            let mut changed = false;
            for value in list.iter_mut() {
                if value.as_str() == Some(old) {
                    *value = ConfigNode::from(new);
                    changed = true;
                }
            }
            changed
        }
        scalar if scalar.as_str() == Some(old) => {
            *scalar = ConfigNode::from(new);
            true
        }
        _ => false,
    }
}
