//! Backend Domain Layer
//!
//! Port/Adapter pattern for permission storage

pub mod events;
pub mod models;
pub mod ports;
pub mod query;

pub use events::{EventAction, EventBus, MatcherGroupEvent};
pub use models::{Entries, MatcherGroup};
pub use ports::{PermissionBackend, NO_SCHEMA};
