//! Test doubles and builders
//!
//! [`ScriptedBackend`] serves a fixed group list with configurable latency,
//! failure injection and an optional barrier, and records every group it is
//! asked to create.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use permstore::backend::domain::query;
use permstore::{
    BackendError, BackendFactory, BackendResolver, BackendResult, Context, Entries, EventAction,
    MatcherGroup, PermissionBackend, Qualifier, Qualifiers,
};
use permstore_tree::ConfigNode;
use tokio::sync::Barrier;

#[derive(Default)]
pub struct ScriptedBackendBuilder {
    identifier: String,
    groups: Vec<MatcherGroup>,
    delay: Duration,
    fail_reads: bool,
    fail_reload: bool,
    barrier: Option<Arc<Barrier>>,
}

impl ScriptedBackendBuilder {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: MatcherGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// One `options` group tagged `user = name`
    pub fn with_user_group(self, name: &str) -> Self {
        self.with_group(MatcherGroup::new(
            MatcherGroup::OPTIONS,
            Entries::default(),
            Qualifiers::new().with(Qualifier::User, name),
        ))
    }

    /// Sleep this long before answering any read
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_reload(mut self) -> Self {
        self.fail_reload = true;
        self
    }

    /// Wait on `barrier` before answering any read
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn build(self) -> Arc<ScriptedBackend> {
        Arc::new(ScriptedBackend {
            identifier: self.identifier,
            groups: Mutex::new(self.groups.into_iter().map(Arc::new).collect()),
            delay: self.delay,
            fail_reads: self.fail_reads,
            fail_reload: self.fail_reload,
            barrier: self.barrier,
            created: Mutex::new(Vec::new()),
            reloads: AtomicUsize::new(0),
            completed_reads: AtomicUsize::new(0),
        })
    }
}

pub struct ScriptedBackend {
    identifier: String,
    groups: Mutex<Vec<Arc<MatcherGroup>>>,
    delay: Duration,
    fail_reads: bool,
    fail_reload: bool,
    barrier: Option<Arc<Barrier>>,
    created: Mutex<Vec<MatcherGroup>>,
    reloads: AtomicUsize,
    /// Reads that got past the delay
    completed_reads: AtomicUsize,
}

impl ScriptedBackend {
    pub fn builder(identifier: &str) -> ScriptedBackendBuilder {
        ScriptedBackendBuilder::new(identifier)
    }

    /// Groups passed to `create_matcher_group`, in call order
    pub fn created(&self) -> Vec<MatcherGroup> {
        self.created.lock().clone()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn completed_reads(&self) -> usize {
        self.completed_reads.load(Ordering::SeqCst)
    }

    async fn read<T>(&self, f: impl FnOnce(&[Arc<MatcherGroup>]) -> T) -> BackendResult<T> {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(BackendError::load(format!("{} read failed", self.identifier)));
        }
        let groups = self.groups.lock().clone();
        Ok(f(&groups))
    }
}

#[async_trait]
impl PermissionBackend for ScriptedBackend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn reload(&self) -> BackendResult<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reload {
            return Err(BackendError::load(format!("{} reload failed", self.identifier)));
        }
        Ok(())
    }

    async fn user_names(&self) -> BackendResult<HashSet<String>> {
        self.read(query::user_names).await
    }

    async fn get_all(&self) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        self.read(|groups| groups.to_vec()).await
    }

    async fn get_matching_groups(
        &self,
        group_type: &str,
        context: Option<&Context>,
    ) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        self.read(|groups| query::matching_groups(groups, group_type, context))
            .await
    }

    async fn get_all_values(&self, qualifier: Qualifier) -> BackendResult<BTreeSet<String>> {
        self.read(|groups| query::all_values(groups, qualifier)).await
    }

    async fn has_any_qualifier(&self, qualifier: Qualifier, value: &str) -> BackendResult<bool> {
        self.read(|groups| query::has_any(groups, qualifier, value)).await
    }

    async fn all_with_qualifier(&self, qualifier: Qualifier) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        self.read(|groups| query::all_with(groups, qualifier)).await
    }

    async fn create_matcher_group(
        &self,
        group_type: &str,
        entries: Entries,
        qualifiers: Qualifiers,
    ) -> BackendResult<Arc<MatcherGroup>> {
        let group = MatcherGroup::new(group_type, entries, qualifiers);
        self.created.lock().push(group.clone());
        let group = Arc::new(group);
        self.groups.lock().push(group.clone());
        Ok(group)
    }

    async fn replace_qualifier(&self, _qualifier: Qualifier, _old: &str, _new: &str) -> BackendResult<()> {
        self.read(|_| ()).await
    }

    fn call_event(
        &self,
        _old: Option<Arc<MatcherGroup>>,
        _new: Option<Arc<MatcherGroup>>,
        _action: EventAction,
    ) {
    }
}

/// Factory for `type: scripted` sections that counts how many backends it built
#[derive(Default)]
pub struct CountingFactory {
    created: AtomicUsize,
}

impl CountingFactory {
    pub fn count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendFactory for CountingFactory {
    async fn create(
        &self,
        identifier: &str,
        _section: &mut ConfigNode,
        _resolver: &BackendResolver<'_>,
    ) -> BackendResult<Arc<dyn PermissionBackend>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedBackend::builder(identifier).build())
    }
}
