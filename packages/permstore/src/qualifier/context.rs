//! Query context
//!
//! Immutable snapshot of situational facts (which user, which world, ...)
//! that qualifier predicates are evaluated against.

use std::collections::{BTreeMap, BTreeSet};

use super::Qualifier;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    facts: BTreeMap<Qualifier, BTreeSet<String>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with one more fact
    pub fn with(mut self, qualifier: Qualifier, value: impl Into<String>) -> Self {
        self.facts.entry(qualifier).or_default().insert(value.into());
        self
    }

    pub fn values(&self, qualifier: Qualifier) -> impl Iterator<Item = &str> + '_ {
        self.facts
            .get(&qualifier)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    pub fn contains(&self, qualifier: Qualifier, value: &str) -> bool {
        self.facts
            .get(&qualifier)
            .is_some_and(|values| values.contains(value))
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
