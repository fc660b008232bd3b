//! Query helpers over a backend's group list
//!
//! Leaf backends keep their groups as an insertion-ordered slice; these
//! functions implement the read side of [`PermissionBackend`] over it.
//!
//! [`PermissionBackend`]: super::ports::PermissionBackend

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::models::MatcherGroup;
use crate::qualifier::{Context, Qualifier};

pub fn matching_groups(
    groups: &[Arc<MatcherGroup>],
    group_type: &str,
    context: Option<&Context>,
) -> Vec<Arc<MatcherGroup>> {
    groups
        .iter()
        .filter(|group| group.group_type() == group_type)
        .filter(|group| context.map_or(true, |ctx| group.matches(ctx)))
        .cloned()
        .collect()
}

pub fn all_values(groups: &[Arc<MatcherGroup>], qualifier: Qualifier) -> BTreeSet<String> {
    groups
        .iter()
        .filter_map(|group| group.qualifiers().get(qualifier))
        .flatten()
        .cloned()
        .collect()
}

pub fn has_any(groups: &[Arc<MatcherGroup>], qualifier: Qualifier, value: &str) -> bool {
    groups
        .iter()
        .any(|group| group.qualifiers().contains(qualifier, value))
}

pub fn all_with(groups: &[Arc<MatcherGroup>], qualifier: Qualifier) -> Vec<Arc<MatcherGroup>> {
    groups
        .iter()
        .filter(|group| group.has_qualifier(qualifier))
        .cloned()
        .collect()
}

pub fn user_names(groups: &[Arc<MatcherGroup>]) -> HashSet<String> {
    all_values(groups, Qualifier::User).into_iter().collect()
}
