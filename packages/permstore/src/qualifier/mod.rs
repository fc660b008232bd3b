//! Qualifiers
//!
//! A [`Qualifier`] is one of a closed set of named dimensions (user, group,
//! world, server, backend) used to tag matcher groups and to filter them
//! against a [`Context`]. Names resolve through a process-wide registry, so
//! every reference to `"world"` is the same key.
//!
//! `Backend` is reserved for write routing: its predicate never matches and it
//! takes no part in context filtering.

pub mod context;

pub use context::Context;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Qualifier {
    User,
    Group,
    World,
    Server,
    /// Routing-only; never matches a context
    Backend,
}

static REGISTRY: Lazy<HashMap<&'static str, Qualifier>> = Lazy::new(|| {
    Qualifier::ALL
        .iter()
        .map(|qualifier| (qualifier.name(), *qualifier))
        .collect()
});

impl Qualifier {
    pub const ALL: [Qualifier; 5] = [
        Qualifier::User,
        Qualifier::Group,
        Qualifier::World,
        Qualifier::Server,
        Qualifier::Backend,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Qualifier::User => "user",
            Qualifier::Group => "group",
            Qualifier::World => "world",
            Qualifier::Server => "server",
            Qualifier::Backend => "backend",
        }
    }

    /// Registered qualifier for `name`, case-insensitive
    pub fn by_name(name: &str) -> Option<Qualifier> {
        REGISTRY.get(name.to_ascii_lowercase().as_str()).copied()
    }

    /// True when the context carries `value` for this qualifier
    pub fn matches(&self, context: &Context, value: &str) -> bool {
        match self {
            Qualifier::Backend => false,
            _ => context.contains(*self, value),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Qualifier {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Qualifier::by_name(s)
            .ok_or_else(|| BackendError::invalid_group(format!("Unknown qualifier '{}'", s)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Qualifier multimap
// ═══════════════════════════════════════════════════════════════════════════

/// Multimap of qualifier to values, iterated in a stable order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qualifiers(BTreeMap<Qualifier, BTreeSet<String>>);

impl Qualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, qualifier: Qualifier, value: impl Into<String>) -> Self {
        self.insert(qualifier, value);
        self
    }

    /// Add a value; returns false if it was already present
    pub fn insert(&mut self, qualifier: Qualifier, value: impl Into<String>) -> bool {
        self.0.entry(qualifier).or_default().insert(value.into())
    }

    pub fn get(&self, qualifier: Qualifier) -> Option<&BTreeSet<String>> {
        self.0.get(&qualifier)
    }

    /// First value in sort order
    pub fn first(&self, qualifier: Qualifier) -> Option<&str> {
        self.get(qualifier)
            .and_then(|values| values.iter().next())
            .map(String::as_str)
    }

    pub fn contains_key(&self, qualifier: Qualifier) -> bool {
        self.0.contains_key(&qualifier)
    }

    pub fn contains(&self, qualifier: Qualifier, value: &str) -> bool {
        self.get(qualifier).is_some_and(|values| values.contains(value))
    }

    /// Remove every value for `qualifier`, returning them
    pub fn remove_all(&mut self, qualifier: Qualifier) -> BTreeSet<String> {
        self.0.remove(&qualifier).unwrap_or_default()
    }

    /// Swap `old` for `new`; returns true if `old` was present
    pub fn replace_value(&mut self, qualifier: Qualifier, old: &str, new: &str) -> bool {
        let Some(values) = self.0.get_mut(&qualifier) else {
            return false;
        };
        if !values.remove(old) {
            return false;
        }
        values.insert(new.to_string());
        true
    }

    /// Every `(qualifier, value)` pair
    pub fn iter(&self) -> impl Iterator<Item = (Qualifier, &str)> + '_ {
        self.0
            .iter()
            .flat_map(|(qualifier, values)| values.iter().map(move |v| (*qualifier, v.as_str())))
    }

    pub fn keys(&self) -> impl Iterator<Item = Qualifier> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of `(qualifier, value)` pairs
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    /// True when, for every qualifier carried (except `Backend`), at least one
    /// of its values matches the context
    pub fn matches(&self, context: &Context) -> bool {
        self.0
            .iter()
            .filter(|(qualifier, _)| **qualifier != Qualifier::Backend)
            .all(|(qualifier, values)| values.iter().any(|v| qualifier.matches(context, v)))
    }
}

impl FromIterator<(Qualifier, String)> for Qualifiers {
    fn from_iter<I: IntoIterator<Item = (Qualifier, String)>>(iter: I) -> Self {
        let mut qualifiers = Qualifiers::new();
        for (qualifier, value) in iter {
            qualifiers.insert(qualifier, value);
        }
        qualifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_case_insensitive() {
        assert_eq!(Qualifier::by_name("world"), Some(Qualifier::World));
        assert_eq!(Qualifier::by_name("WORLD"), Some(Qualifier::World));
        assert_eq!(Qualifier::by_name("Backend"), Some(Qualifier::Backend));
        assert_eq!(Qualifier::by_name("dimension"), None);
        assert!("dimension".parse::<Qualifier>().is_err());
    }

    #[test]
    fn test_backend_never_matches() {
        let ctx = Context::new().with(Qualifier::Backend, "file");
        assert!(!Qualifier::Backend.matches(&ctx, "file"));
        assert!(Qualifier::World.matches(&Context::new().with(Qualifier::World, "nether"), "nether"));
    }

    #[test]
    fn test_replace_value() {
        let mut qualifiers = Qualifiers::new()
            .with(Qualifier::User, "alice")
            .with(Qualifier::World, "nether");

        assert!(qualifiers.replace_value(Qualifier::World, "nether", "hell"));
        assert!(!qualifiers.replace_value(Qualifier::World, "nether", "x"));
        assert!(qualifiers.contains(Qualifier::World, "hell"));
        assert_eq!(qualifiers.len(), 2);
    }

    #[test]
    fn test_remove_all() {
        let mut qualifiers = Qualifiers::new()
            .with(Qualifier::Backend, "C")
            .with(Qualifier::User, "alice");

        let removed = qualifiers.remove_all(Qualifier::Backend);
        assert_eq!(removed.into_iter().collect::<Vec<_>>(), vec!["C".to_string()]);
        assert!(!qualifiers.contains_key(Qualifier::Backend));
        assert!(qualifiers.remove_all(Qualifier::Backend).is_empty());
    }

    #[test]
    fn test_matches_requires_every_qualifier() {
        let qualifiers = Qualifiers::new()
            .with(Qualifier::User, "alice")
            .with(Qualifier::World, "nether")
            .with(Qualifier::World, "end");

        let in_end = Context::new()
            .with(Qualifier::User, "alice")
            .with(Qualifier::World, "end");
        let in_overworld = Context::new()
            .with(Qualifier::User, "alice")
            .with(Qualifier::World, "overworld");

        assert!(qualifiers.matches(&in_end));
        assert!(!qualifiers.matches(&in_overworld));
        assert!(Qualifiers::new().matches(&in_overworld));
    }

    #[test]
    fn test_serializes_as_name_map() {
        let qualifiers = Qualifiers::new().with(Qualifier::User, "alice");
        let json = serde_json::to_string(&qualifiers).unwrap();
        assert_eq!(json, r#"{"user":["alice"]}"#);
    }
}
