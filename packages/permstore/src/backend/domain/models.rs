//! Matcher group models

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::qualifier::{Context, Qualifier, Qualifiers};

/// Entries of a matcher group: an ordered list or a string map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entries {
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl Entries {
    pub fn is_empty(&self) -> bool {
        match self {
            Entries::List(items) => items.is_empty(),
            Entries::Map(map) => map.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Entries::List(items) => items.len(),
            Entries::Map(map) => map.len(),
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Entries::List(items) => Some(items),
            Entries::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Entries::Map(map) => Some(map),
            Entries::List(_) => None,
        }
    }
}

impl Default for Entries {
    fn default() -> Self {
        Entries::List(Vec::new())
    }
}

/// Persisted rule set of one type, tagged with qualifiers.
///
/// Immutable once handed out; changes produce a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherGroup {
    group_type: String,
    entries: Entries,
    qualifiers: Qualifiers,
}

impl MatcherGroup {
    pub const PERMISSIONS: &'static str = "permissions";
    pub const OPTIONS: &'static str = "options";
    pub const INHERITANCE: &'static str = "inheritance";

    pub fn new(group_type: impl Into<String>, entries: Entries, qualifiers: Qualifiers) -> Self {
        Self {
            group_type: group_type.into(),
            entries,
            qualifiers,
        }
    }

    pub fn group_type(&self) -> &str {
        &self.group_type
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    /// True when every qualifier on the group matches `context`
    pub fn matches(&self, context: &Context) -> bool {
        self.qualifiers.matches(context)
    }

    pub fn has_qualifier(&self, qualifier: Qualifier) -> bool {
        self.qualifiers.contains_key(qualifier)
    }

    /// Copy with `old` replaced by `new` for `qualifier`, `None` if absent
    pub fn with_replaced_qualifier(&self, qualifier: Qualifier, old: &str, new: &str) -> Option<Self> {
        let mut qualifiers = self.qualifiers.clone();
        qualifiers
            .replace_value(qualifier, old, new)
            .then(|| Self::new(self.group_type.clone(), self.entries.clone(), qualifiers))
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
