//! Permission Backends
//!
//! # Hexagonal Architecture
//! ```text
//! application/ (provider, factories)
//!           ↓
//! domain/ (matcher groups, events, ports)
//!           ↓
//! infrastructure/ (memory, file, multi)
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{BackendFactory, BackendProvider, BackendResolver};
pub use domain::{
    EventAction, EventBus, Entries, MatcherGroup, MatcherGroupEvent, PermissionBackend, NO_SCHEMA,
};
pub use infrastructure::{FileBackend, MemoryBackend, MultiBackend};
