//! Backend Infrastructure Layer
//!
//! Concrete implementations of the PermissionBackend port

pub mod file_backend;
pub mod memory_backend;
pub mod multi_backend;

pub use file_backend::{FileBackend, LEGACY_BACKUP_SUFFIX};
pub use memory_backend::MemoryBackend;
pub use multi_backend::MultiBackend;
