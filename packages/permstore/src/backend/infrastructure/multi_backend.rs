//! Composite Permission Backend
//!
//! Holds no data of its own. Every read is sent to all children at once and
//! merged once all of them have answered:
//!
//! | shape     | merge                                             |
//! |-----------|---------------------------------------------------|
//! | list      | concatenated in declaration order                 |
//! | set       | union                                             |
//! | bool      | OR                                                |
//! | unit      | complete when every child completes               |
//!
//! Any child failure fails the whole call; dropping the composite future drops
//! the outstanding child futures with it.
//!
//! Writes go to a single child chosen by the reserved `backend` qualifier,
//! which is stripped before the child sees the group. Unknown or missing
//! names fall back to the first-listed child.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use tracing::{debug, warn};

use crate::backend::domain::{EventAction, Entries, MatcherGroup, PermissionBackend, NO_SCHEMA};
use crate::error::{BackendError, BackendResult};
use crate::qualifier::{Context, Qualifier, Qualifiers};

pub struct MultiBackend {
    identifier: String,
    /// Children in declaration order; index 0 is the default write target
    backends: Vec<Arc<dyn PermissionBackend>>,
    /// Lower-cased identifier to child
    by_name: HashMap<String, Arc<dyn PermissionBackend>>,
}

impl MultiBackend {
    /// Composite over `backends`, which must not be empty.
    ///
    /// Write routing matches the `backend` qualifier against each child's own
    /// [`PermissionBackend::identifier`], case-insensitively. Two children whose
    /// identifiers differ only by case are a configuration error.
    pub fn new(
        identifier: impl Into<String>,
        backends: Vec<Arc<dyn PermissionBackend>>,
    ) -> BackendResult<Self> {
        let identifier = identifier.into();
        if backends.is_empty() {
            return Err(BackendError::configuration(format!(
                "Multi backend '{}' has no child backends configured",
                identifier
            )));
        }

        let mut by_name = HashMap::with_capacity(backends.len());
        for backend in &backends {
            let name = backend.identifier().to_lowercase();
            if by_name.insert(name, backend.clone()).is_some() {
                return Err(BackendError::configuration(format!(
                    "Multi backend '{}' lists child backend '{}' more than once",
                    identifier,
                    backend.identifier()
                )));
            }
        }

        Ok(Self {
            identifier,
            backends,
            by_name,
        })
    }

    pub fn backends(&self) -> &[Arc<dyn PermissionBackend>] {
        &self.backends
    }

    fn default_backend(&self) -> &Arc<dyn PermissionBackend> {
        &self.backends[0]
    }

    /// Run `op` against every child concurrently; results in declaration order
    async fn fan_out<'a, T, Fut>(
        &'a self,
        op: impl Fn(&'a dyn PermissionBackend) -> Fut,
    ) -> BackendResult<Vec<T>>
    where
        Fut: Future<Output = BackendResult<T>> + 'a,
    {
        debug!(backend = %self.identifier, children = self.backends.len(), "Fanning out request");
        try_join_all(self.backends.iter().map(|backend| op(backend.as_ref()))).await
    }

    /// Strip the `backend` qualifier and resolve the write target
    fn route(&self, qualifiers: &mut Qualifiers) -> &Arc<dyn PermissionBackend> {
        let requested = qualifiers.remove_all(Qualifier::Backend);
        let Some(name) = requested.into_iter().next() else {
            return self.default_backend();
        };

        match self.by_name.get(&name.to_lowercase()) {
            Some(backend) => backend,
            None => {
                warn!(
                    backend = %self.identifier,
                    requested = %name,
                    "Backend specified '{}' is unknown, falling back to first-listed backend",
                    name
                );
                self.default_backend()
            }
        }
    }
}

#[async_trait]
impl PermissionBackend for MultiBackend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Reloads every child, even after a failure, and reports all failures together
    async fn reload(&self) -> BackendResult<()> {
        let results = join_all(self.backends.iter().map(|backend| backend.reload())).await;

        let failures: Vec<(String, BackendError)> = self
            .backends
            .iter()
            .zip(results)
            .filter_map(|(backend, result)| {
                result.err().map(|err| (backend.identifier().to_string(), err))
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            warn!(backend = %self.identifier, failed = failures.len(), "Child reloads failed");
            Err(BackendError::aggregate(failures))
        }
    }

    async fn user_names(&self) -> BackendResult<HashSet<String>> {
        let sets = self.fan_out(|backend| backend.user_names()).await?;
        Ok(sets.into_iter().flatten().collect())
    }

    async fn get_all(&self) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        let lists = self.fan_out(|backend| backend.get_all()).await?;
        Ok(lists.into_iter().flatten().collect())
    }

    async fn get_matching_groups(
        &self,
        group_type: &str,
        context: Option<&Context>,
    ) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        let lists = self
            .fan_out(|backend| backend.get_matching_groups(group_type, context))
            .await?;
        Ok(lists.into_iter().flatten().collect())
    }

    async fn get_all_values(&self, qualifier: Qualifier) -> BackendResult<BTreeSet<String>> {
        let sets = self
            .fan_out(|backend| backend.get_all_values(qualifier))
            .await?;
        Ok(sets.into_iter().flatten().collect())
    }

    async fn has_any_qualifier(&self, qualifier: Qualifier, value: &str) -> BackendResult<bool> {
        let answers = self
            .fan_out(|backend| backend.has_any_qualifier(qualifier, value))
            .await?;
        Ok(answers.into_iter().any(|found| found))
    }

    async fn all_with_qualifier(&self, qualifier: Qualifier) -> BackendResult<Vec<Arc<MatcherGroup>>> {
        let lists = self
            .fan_out(|backend| backend.all_with_qualifier(qualifier))
            .await?;
        Ok(lists.into_iter().flatten().collect())
    }

    async fn create_matcher_group(
        &self,
        group_type: &str,
        entries: Entries,
        qualifiers: Qualifiers,
    ) -> BackendResult<Arc<MatcherGroup>> {
        let mut qualifiers = qualifiers;
        let target = self.route(&mut qualifiers);
        debug!(
            backend = %self.identifier,
            target = target.identifier(),
            group_type,
            "Routing matcher group creation"
        );
        target
            .create_matcher_group(group_type, entries, qualifiers)
            .await
    }

    async fn replace_qualifier(&self, qualifier: Qualifier, old: &str, new: &str) -> BackendResult<()> {
        self.fan_out(|backend| backend.replace_qualifier(qualifier, old, new))
            .await?;
        Ok(())
    }

    /// Children fire their own events
    fn call_event(
        &self,
        _old: Option<Arc<MatcherGroup>>,
        _new: Option<Arc<MatcherGroup>>,
        _action: EventAction,
    ) {
    }

    fn schema_version(&self) -> i32 {
        NO_SCHEMA
    }

    async fn set_schema_version(&self, _version: i32) -> BackendResult<()> {
        Ok(())
    }
}
