//! permstore-tree - Configuration Tree & Versioned Rewrites
//!
//! > "Load the tree once, rewrite it forward, never lose a leaf."
//!
//! ## Core Principles
//!
//! 1. **Virtual vs Null**: an absent node (`None` from a lookup) is not the same as a present `Null`
//! 2. **Snapshot, then apply**: every rule materializes its matches before any action runs
//! 3. **Monotonic versions**: a versioned migration only ever moves `schema-version` forward
//!
//! ## Layout
//!
//! - `node` / `path` / `cursor`: the tree model and path addressing
//! - `pattern`: fixed-length wildcard path patterns
//! - `transform` / `actions`: rule sets and the reusable rewrite actions
//! - `versioned`: ascending version chains keyed by schema version
//! - `codec` / `format`: explicit struct-to-tree codecs and YAML/JSON rendering
//!
//! ## Usage
//!
//! ```rust
//! use permstore_tree::{
//!     actions, ConfigNode, NodePath, PathPattern, Transformation, VersionedTransformation,
//! };
//!
//! let mut tree = ConfigNode::mapping();
//! tree.set(&NodePath::from(["users", "alice", "prefix"]), ConfigNode::from("[A]"));
//!
//! let migration = VersionedTransformation::builder()
//!     .add_version(
//!         1,
//!         Transformation::builder()
//!             .add_action(
//!                 "*.*".parse::<PathPattern>().unwrap(),
//!                 actions::relocate(&["prefix"], "options"),
//!             )
//!             .build(),
//!     )
//!     .build();
//!
//! let outcome = migration.apply(&mut tree);
//! assert!(outcome.changed());
//! assert_eq!(
//!     tree.get(&NodePath::from(["users", "alice", "options", "prefix"]))
//!         .and_then(|n| n.as_str()),
//!     Some("[A]")
//! );
//! ```

pub mod actions;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod format;
pub mod node;
pub mod path;
pub mod pattern;
pub mod transform;
pub mod versioned;

pub use codec::TreeCodec;
pub use cursor::NodeCursor;
pub use error::{TreeError, TreeResult};
pub use format::FileFormat;
pub use node::ConfigNode;
pub use path::{NodePath, PathSegment};
pub use pattern::{PathPattern, PatternSegment};
pub use transform::{TransformAction, TransformStats, Transformation, TransformationBuilder};
pub use versioned::{MigrationOutcome, VersionedTransformation, VersionedTransformationBuilder};
