//! Backend Application Layer
//!
//! Builds backends from configuration sections

pub mod provider;

pub use provider::{
    BackendFactory, BackendProvider, BackendResolver, FileBackendFactory, MemoryBackendFactory,
    MultiBackendFactory,
};
