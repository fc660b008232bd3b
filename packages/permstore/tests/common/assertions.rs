//! Custom assertions for permstore tests

use std::sync::Arc;

use permstore::{BackendError, ErrorKind, MatcherGroup, Qualifier};

/// Assert the groups carry `qualifier` values in exactly this order
pub fn assert_qualifier_order(groups: &[Arc<MatcherGroup>], qualifier: Qualifier, expected: &[&str]) {
    let actual: Vec<&str> = groups
        .iter()
        .map(|group| group.qualifiers().first(qualifier).unwrap_or("<none>"))
        .collect();
    assert_eq!(actual, expected, "Unexpected group order");
}

pub fn assert_error_kind(err: &BackendError, kind: ErrorKind) {
    assert_eq!(err.kind, kind, "Expected {} error, got: {}", kind, err);
}
