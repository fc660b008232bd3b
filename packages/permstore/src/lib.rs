//! permstore - Matcher-Group Permission Backends
//!
//! > "Ask every backend, answer once, write to exactly one."
//!
//! ## Core Principles
//!
//! 1. **Qualified rules**: every rule is a matcher group gated by qualifiers (user, group, world, server)
//! 2. **Composite reads, routed writes**: `MultiBackend` fans reads out concurrently and routes writes by the `backend` qualifier
//! 3. **Forward-only data**: stored files are migrated to the current schema on every load
//!
//! ## Layout
//!
//! - `qualifier`: qualifier kinds, qualifier sets and query contexts
//! - `backend`: the `PermissionBackend` port, memory/file/multi backends and the provider
//! - `migration`: legacy permission canonicalization and the permissions schema chain
//! - `config`: service configuration sections and their codecs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use permstore::{load_config, BackendProvider, MatcherGroup, Qualifier};
//!
//! # async fn run() -> permstore::BackendResult<()> {
//! let config = load_config(Path::new("permissions-config.yml"))?;
//! let provider = BackendProvider::new(config, "data");
//! let backend = provider.create_default_backend().await?;
//!
//! for group in backend
//!     .get_matching_groups(MatcherGroup::PERMISSIONS, None)
//!     .await?
//! {
//!     println!("{:?} -> {:?}", group.qualifiers().first(Qualifier::User), group.entries());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod migration;
pub mod qualifier;

pub use error::{BackendError, BackendResult, ErrorKind};

pub use backend::{
    BackendFactory, BackendProvider, BackendResolver, Entries, EventAction, EventBus, FileBackend,
    MatcherGroup, MatcherGroupEvent, MemoryBackend, MultiBackend, PermissionBackend, NO_SCHEMA,
};
pub use config::{load_config, save_config, PermissionsConfig};
pub use qualifier::{Context, Qualifier, Qualifiers};
