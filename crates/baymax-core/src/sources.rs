//! Flattening and merging of source attributions.
//!
//! Stored form: comma+space joined names, no empty entries, no stray
//! separators. `normalize_sources` is idempotent over its own output.
//!
//! Merging is exact-match after trimming: `"WHO"` and `"who"` stay distinct.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::corpus::render_scalar;

pub const SOURCE_SEPARATOR: &str = ", ";

/// Flattens whatever shape `sources` arrived in (list, string, absent) into
/// the stored string form.
pub fn normalize_sources(value: Option<&Value>) -> String {
    let mut names: Vec<String> = Vec::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                names.extend(split_names(&render_scalar(item)));
            }
        }
        Some(other) => names.extend(split_names(&render_scalar(other))),
    }
    names.join(SOURCE_SEPARATOR)
}

/// Same as [`normalize_sources`] for a value that is already a string.
pub fn normalize_sources_str(raw: &str) -> String {
    split_names(raw).collect::<Vec<_>>().join(SOURCE_SEPARATOR)
}

/// Union of all names across the given stored strings, deduplicated on exact
/// post-trim equality and sorted lexicographically.
pub fn merge_sources<'a, I>(stored: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    stored
        .into_iter()
        .flat_map(split_names)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

fn split_names(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_is_joined_in_order() {
        let v = json!(["WHO", "Kemenkes"]);
        assert_eq!(normalize_sources(Some(&v)), "WHO, Kemenkes");
    }

    #[test]
    fn absent_and_null_are_empty() {
        assert_eq!(normalize_sources(None), "");
        assert_eq!(normalize_sources(Some(&Value::Null)), "");
        assert_eq!(normalize_sources(Some(&json!([]))), "");
    }

    #[test]
    fn stray_separators_are_dropped() {
        assert_eq!(normalize_sources_str(" WHO ,, ,Kemenkes,"), "WHO, Kemenkes");
        assert_eq!(normalize_sources(Some(&json!(["", " "]))), "");
    }

    #[test]
    fn non_string_entries_are_stringified() {
        assert_eq!(normalize_sources(Some(&json!(["CDC", 2023]))), "CDC, 2023");
        assert_eq!(normalize_sources(Some(&json!(7))), "7");
    }

    #[test]
    fn merge_is_exact_match() {
        let merged = merge_sources(["Kemenkes", "who, Kemenkes"]);
        assert_eq!(merged, vec!["Kemenkes".to_string(), "who".to_string()]);
    }
}
