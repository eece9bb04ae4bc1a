use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static NON_ALPHANUMERIC_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("static slug pattern is valid")
});

/// API slug for a list or attribute created without one: lower-cased, every
/// run of other characters collapsed to `_`, no leading or trailing `_`.
pub fn derive_api_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_ALPHANUMERIC_RUN
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Attio task deadlines are dates; drop any time-of-day suffix.
pub fn deadline_date(raw: &str) -> &str {
    match raw.split_once('T') {
        Some((date, _)) => date,
        None => raw,
    }
}

/// Attribute values as sent on record writes.
///
/// Scalars and arrays are forwarded unchanged; the API accepts both shapes,
/// so no scalar is wrapped into a one-element array here.
pub fn normalize_write_values(values: &Map<String, Value>) -> Map<String, Value> {
    values
        .iter()
        .map(|(slug, value)| (slug.clone(), value.clone()))
        .collect()
}
