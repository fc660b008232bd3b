//! Permission Backend Port (Trait Interface)
//!
//! Port/Adapter pattern for storage flexibility:
//! - Memory: scratch data, tests
//! - File: JSON permissions file with schema migration
//! - Multi: composite over any of the above

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use super::events::EventAction;
use super::models::{Entries, MatcherGroup};
use crate::error::BackendResult;
use crate::qualifier::{Context, Qualifier, Qualifiers};

/// Schema version reported by backends without a persisted schema
pub const NO_SCHEMA: i32 = -1;

/// Permission Backend Port (Primary Interface)
///
/// Every storage backend implements this trait. All data operations are
/// asynchronous; groups are handed out as shared immutable values.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Identifier this backend was configured under
    fn identifier(&self) -> &str;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Lifecycle
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Reload persisted state.
    ///
    /// On failure the backend must not keep serving the previous data as if
    /// it were fresh.
    async fn reload(&self) -> BackendResult<()>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Identifiers of every known user subject
    async fn user_names(&self) -> BackendResult<HashSet<String>>;

    /// Every stored group (bulk export)
    async fn get_all(&self) -> BackendResult<Vec<Arc<MatcherGroup>>>;

    /// Groups of `group_type`, in insertion order, filtered by `context` when given
    async fn get_matching_groups(
        &self,
        group_type: &str,
        context: Option<&Context>,
    ) -> BackendResult<Vec<Arc<MatcherGroup>>>;

    /// Every distinct value used for `qualifier`
    async fn get_all_values(&self, qualifier: Qualifier) -> BackendResult<BTreeSet<String>>;

    /// True if any stored group carries `qualifier = value`
    async fn has_any_qualifier(&self, qualifier: Qualifier, value: &str) -> BackendResult<bool>;

    /// Every group carrying `qualifier` at any value
    async fn all_with_qualifier(&self, qualifier: Qualifier) -> BackendResult<Vec<Arc<MatcherGroup>>>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Mutations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Persist a new group and fire exactly one creation event.
    ///
    /// On failure nothing is written.
    async fn create_matcher_group(
        &self,
        group_type: &str,
        entries: Entries,
        qualifiers: Qualifiers,
    ) -> BackendResult<Arc<MatcherGroup>>;

    /// Rewrite `qualifier = old` to `qualifier = new` on every stored group
    async fn replace_qualifier(&self, qualifier: Qualifier, old: &str, new: &str) -> BackendResult<()>;

    /// Notify listeners of a change
    fn call_event(
        &self,
        old: Option<Arc<MatcherGroup>>,
        new: Option<Arc<MatcherGroup>>,
        action: EventAction,
    );

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Schema
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Persisted schema version, [`NO_SCHEMA`] if the backend has none
    fn schema_version(&self) -> i32 {
        NO_SCHEMA
    }

    /// Persist a schema version; ignored by backends without a schema
    async fn set_schema_version(&self, _version: i32) -> BackendResult<()> {
        Ok(())
    }
}
