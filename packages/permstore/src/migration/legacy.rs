//! Legacy permission strings
//!
//! Old permission files used regex-style alternation groups (`a.(b|c)`) and a
//! trailing `.*` to mean "and everything below". The current format uses
//! brace globs and treats the trailing wildcard as implied.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static MATCHER_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((.*?)\)").expect("valid regex"));

/// Canonicalize a legacy permission string.
///
/// Every non-overlapping `(a|b|c)` becomes `{a,b,c}`; a trailing `.*` is then
/// dropped unless it is the whole string.
///
/// ```
/// use permstore::migration::legacy::convert_permission;
///
/// assert_eq!(convert_permission("foo.(bar|baz).*"), "foo.{bar,baz}");
/// assert_eq!(convert_permission("a.b.c"), "a.b.c");
/// ```
pub fn convert_permission(permission: &str) -> String {
    let mut converted = MATCHER_GROUP
        .replace_all(permission, |caps: &Captures<'_>| {
            format!("{{{}}}", caps[1].replace('|', ","))
        })
        .into_owned();

    if converted.len() > 2 && converted.ends_with(".*") {
        converted.truncate(converted.len() - 2);
    }
    converted
}
