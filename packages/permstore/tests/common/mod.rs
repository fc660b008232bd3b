//! Common test utilities for permstore
//!
//! Shared fixtures, a scriptable backend double and domain assertions for
//! the integration tests.

#![allow(dead_code)]

mod assertions;
mod builders;
mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
