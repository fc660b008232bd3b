//! In-Memory Permission Backend
//!
//! Insertion-ordered group list behind a lock. Nothing is persisted, so
//! `reload` has nothing to do and there is no schema version.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::backend::domain::{
    query, EventAction, EventBus, Entries, MatcherGroup, MatcherGroupEvent, PermissionBackend,
};
use crate::error::BackendResult;
use crate::qualifier::{Context, Qualifier, Qualifiers};

pub struct MemoryBackend {
    identifier: String,
    groups: RwLock<Vec<Arc<MatcherGroup>>>,
    events: EventBus,
}

impl MemoryBackend {
    pub fn new(identifier: impl Into<String>, events: EventBus) -> Self {
        Self {
            identifier: identifier.into(),
            groups: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Backend with its own private event bus
    pub fn standalone(identifier: impl Into<String>) -> Self {
        Self::new(identifier, EventBus::new())
    }

    /// Seed groups without firing events
    pub fn with_groups(self, groups: impl IntoIterator<Item = MatcherGroup>) -> Self {
        self.groups.write().extend(groups.into_iter().map(Arc::new));
        self
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

#[async_trait]
impl PermissionBackend for MemoryBackend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn reload(&self) -> BackendResult<()> {
        Ok(())
    }

    async fn user_names(&self) -> BackendResult<HashSet<String>> {
        Ok(query::user_names(&self.groups.read()))
    }

    async fn get_all(&self) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        Ok(self.groups.read().clone())
    }

    async fn get_matching_groups(
        &self,
        group_type: &str,
        context: Option<&Context>,
    ) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        Ok(query::matching_groups(&self.groups.read(), group_type, context))
    }

    async fn get_all_values(&self, qualifier: Qualifier) -> BackendResult<BTreeSet<String>> {
        Ok(query::all_values(&self.groups.read(), qualifier))
    }

    async fn has_any_qualifier(&self, qualifier: Qualifier, value: &str) -> BackendResult<bool> {
        Ok(query::has_any(&self.groups.read(), qualifier, value))
    }

    async fn all_with_qualifier(&self, qualifier: Qualifier) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        Ok(query::all_with(&self.groups.read(), qualifier))
    }

    async fn create_matcher_group(
        &self,
        group_type: &str,
        entries: Entries,
        qualifiers: Qualifiers,
    ) -> BackendResult<Arc<MatcherGroup>> {
        let group = Arc::new(MatcherGroup::new(group_type, entries, qualifiers));
        self.groups.write().push(group.clone());
        debug!(backend = %self.identifier, group_type, "Created matcher group");
        self.call_event(None, Some(group.clone()), EventAction::Create);
        Ok(group)
    }

    async fn replace_qualifier(&self, qualifier: Qualifier, old: &str, new: &str) -> BackendResult<()> {
        let mut changed = Vec::new();
        {
            let mut groups = self.groups.write();
            for slot in groups.iter_mut() {
                if let Some(replaced) = slot.with_replaced_qualifier(qualifier, old, new) {
                    let replaced = Arc::new(replaced);
                    let previous = std::mem::replace(slot, replaced.clone());
                    changed.push((previous, replaced));
                }
            }
        }

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
}
