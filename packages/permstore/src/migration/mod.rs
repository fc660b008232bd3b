//! Permissions data migration
//!
//! - `legacy`: canonicalization of old-style permission strings
//! - `schema`: the versioned chain that brings a permissions tree up to date

pub mod legacy;
pub mod schema;

pub use legacy::convert_permission;
pub use schema::{permissions_schema, PermissionListToTree, CURRENT_SCHEMA_VERSION};
