//! Backend Provider
//!
//! Turns configuration sections into live backends. Each section names a
//! factory through its `type` field; factories may call back into the
//! provider to build children (the `multi` type does).
//!
//! Cycle detection follows the chain of one creation call: concurrent
//! creations of the same backend do not see each other, and a cancelled
//! creation leaves nothing behind.
//!
//! Factories may rewrite their section (a converted legacy file changes the
//! `file` field). The rewritten section is stored back into the provider's
//! configuration whether creation succeeded or not.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use permstore_tree::{ConfigNode, TreeCodec};
use tracing::{debug, info};

use crate::backend::domain::{EventBus, PermissionBackend};
use crate::backend::infrastructure::{FileBackend, MemoryBackend, MultiBackend};
use crate::config::{
    write_back, FileBackendConfig, MemoryBackendConfig, MultiBackendConfig, PermissionsConfig,
};
use crate::error::{BackendError, BackendResult};

/// Builds one backend type from its configuration section
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// `section` may be modified; the provider persists the change
    async fn create(
        &self,
        identifier: &str,
        section: &mut ConfigNode,
        resolver: &BackendResolver<'_>,
    ) -> BackendResult<Arc<dyn PermissionBackend>>;
}

/// Provider handle scoped to one creation chain, handed to factories
pub struct BackendResolver<'a> {
    provider: &'a BackendProvider,
    /// Identifiers being created on this call path, outermost first
    chain: Vec<String>,
}

impl BackendResolver<'_> {
    pub fn provider(&self) -> &BackendProvider {
        self.provider
    }

    pub fn base_dir(&self) -> &Path {
        self.provider.base_dir()
    }

    pub fn events(&self) -> EventBus {
        self.provider.events()
    }

    /// Create a child backend as part of this chain
    pub async fn create_backend(&self, identifier: &str) -> BackendResult<Arc<dyn PermissionBackend>> {
        self.provider.create_in_chain(identifier, &self.chain).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Built-in factories
// ═══════════════════════════════════════════════════════════════════════════

/// `type: memory`
pub struct MemoryBackendFactory;

#[async_trait]
impl BackendFactory for MemoryBackendFactory {
    async fn create(
        &self,
        identifier: &str,
        section: &mut ConfigNode,
        resolver: &BackendResolver<'_>,
    ) -> BackendResult<Arc<dyn PermissionBackend>> {
        MemoryBackendConfig::decode(section)?;
        Ok(Arc::new(MemoryBackend::new(identifier, resolver.events())))
    }
}

/// `type: file`
pub struct FileBackendFactory;

#[async_trait]
impl BackendFactory for FileBackendFactory {
    async fn create(
        &self,
        identifier: &str,
        section: &mut ConfigNode,
        resolver: &BackendResolver<'_>,
    ) -> BackendResult<Arc<dyn PermissionBackend>> {
        let mut config = FileBackendConfig::decode(section)?;
        let result =
            FileBackend::open(identifier, &mut config, resolver.base_dir(), resolver.events()).await;
        write_back(section, &config);
        Ok(Arc::new(result?))
    }
}

/// `type: multi`
///
/// Children are created under their configured names, so the `backend`
/// qualifier routes by the names listed in `backends`.
pub struct MultiBackendFactory;

#[async_trait]
impl BackendFactory for MultiBackendFactory {
    async fn create(
        &self,
        identifier: &str,
        section: &mut ConfigNode,
        resolver: &BackendResolver<'_>,
    ) -> BackendResult<Arc<dyn PermissionBackend>> {
        let config = MultiBackendConfig::decode(section)?;
        if config.backends.is_empty() {
            write_back(section, &config);
            return Err(BackendError::configuration(format!(
                "Multi backend '{}' has no child backends configured",
                identifier
            )));
        }

        let mut children = Vec::with_capacity(config.backends.len());
        for child in &config.backends {
            children.push(resolver.create_backend(child).await?);
        }

        Ok(Arc::new(MultiBackend::new(identifier, children)?))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Provider
// ═══════════════════════════════════════════════════════════════════════════

pub struct BackendProvider {
    config: Mutex<PermissionsConfig>,
    factories: RwLock<HashMap<String, Arc<dyn BackendFactory>>>,
    base_dir: PathBuf,
    events: EventBus,
}

impl BackendProvider {
    /// Provider with the `memory`, `file` and `multi` factories registered
    pub fn new(config: PermissionsConfig, base_dir: impl Into<PathBuf>) -> Self {
        let provider = Self {
            config: Mutex::new(config),
            factories: RwLock::new(HashMap::new()),
            base_dir: base_dir.into(),
            events: EventBus::new(),
        };
        provider.register_factory("memory", Arc::new(MemoryBackendFactory));
        provider.register_factory("file", Arc::new(FileBackendFactory));
        provider.register_factory("multi", Arc::new(MultiBackendFactory));
        provider
    }

    /// Register (or replace) the factory for a backend type
    pub fn register_factory(&self, backend_type: impl Into<String>, factory: Arc<dyn BackendFactory>) {
        self.factories
            .write()
            .insert(backend_type.into().to_lowercase(), factory);
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Bus shared by every backend this provider creates
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Snapshot of the configuration including write-backs so far
    pub fn config(&self) -> PermissionsConfig {
        self.config.lock().clone()
    }

    /// Create the backend named by `default-backend`
    pub async fn create_default_backend(&self) -> BackendResult<Arc<dyn PermissionBackend>> {
        let identifier = self.config.lock().default_backend.clone().ok_or_else(|| {
            BackendError::configuration("No default backend configured")
        })?;
        self.create_backend(&identifier).await
    }

    pub async fn create_backend(&self, identifier: &str) -> BackendResult<Arc<dyn PermissionBackend>> {
        self.create_in_chain(identifier, &[]).await
    }

    async fn create_in_chain(
        &self,
        identifier: &str,
        chain: &[String],
    ) -> BackendResult<Arc<dyn PermissionBackend>> {
        if chain.iter().any(|id| id == identifier) {
            let mut cycle = chain.to_vec();
            cycle.push(identifier.to_string());
            return Err(BackendError::configuration(format!(
                "Backend reference cycle: {}",
                cycle.join(" -> ")
            )));
        }

        let mut section = self.config.lock().section(identifier).cloned().ok_or_else(|| {
            BackendError::configuration(format!("Backend '{}' is not configured", identifier))
        })?;

        let backend_type = PermissionsConfig::backend_type(&section)?;
        let factory = self
            .factories
            .read()
            .get(&backend_type.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                BackendError::configuration(format!(
                    "Backend '{}' has unknown type '{}'",
                    identifier, backend_type
                ))
            })?;

        let mut chain = chain.to_vec();
        chain.push(identifier.to_string());
        let resolver = BackendResolver {
            provider: self,
            chain,
        };

        debug!(backend = identifier, backend_type = %backend_type, "Creating backend");
        let result = factory.create(identifier, &mut section, &resolver).await;

        self.config
            .lock()
            .backends
            .insert(identifier.to_string(), section);

        if result.is_ok() {
            info!(backend = identifier, backend_type = %backend_type, "Backend created");
        }
        result
    }
}
