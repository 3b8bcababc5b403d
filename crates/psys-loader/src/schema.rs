// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared schema-validation helpers used by every `load_*` function: closed-key enforcement with
//! `x_`/`x.` extension promotion, expected-schema-id checks, sortedness warnings, and
//! duplicate-id checks.

use psys_core::CanonicalValue;
use psys_error::{ErrorCode, Severity, Violation};
use serde_json::Value;
use std::collections::BTreeMap;

/// Checks that `doc["schema"]` equals `expected`. Pushes a [`Violation`] otherwise.
pub fn check_schema_id(doc: &Value, expected: &str, path: &str, violations: &mut Vec<Violation>) {
    let actual = doc.get("schema").and_then(Value::as_str);
    if actual != Some(expected) {
        violations.push(
            Violation::new(
                ErrorCode::SchemaWrongId,
                format!(
                    "expected schema {expected:?}, found {:?}",
                    actual.unwrap_or("<missing>")
                ),
                Severity::Error,
            )
            .with_context("path", path),
        );
    }
}

/// Given a mutable JSON object and its closed set of allowed keys, removes every `x_`/`x.`
/// extension key into the returned map and pushes a [`Violation`] for any other key outside the
/// allowed set. Re-inserts the collected extensions under the `"extensions"` key so the caller
/// can subsequently `serde_json::from_value` the object into its typed struct.
pub fn promote_extensions(
    value: &mut Value,
    allowed_keys: &[&str],
    path: &str,
    violations: &mut Vec<Violation>,
) {
    let Value::Object(map) = value else {
        return;
    };
    let mut extensions: BTreeMap<String, CanonicalValue> = BTreeMap::new();
    let mut unknown: Vec<String> = Vec::new();
    let keys: Vec<String> = map.keys().cloned().collect();
    for k in keys {
        if allowed_keys.contains(&k.as_str()) || k == "extensions" {
            continue;
        }
        if k.starts_with("x_") || k.starts_with("x.") {
            if let Some(v) = map.remove(&k) {
                extensions.insert(k, CanonicalValue(v));
            }
        } else {
            unknown.push(k);
        }
    }
    if !unknown.is_empty() {
        unknown.sort();
        violations.push(
            Violation::new(
                ErrorCode::SchemaUnknownKey,
                format!("unknown key(s) {}", unknown.join(", ")),
                Severity::Error,
            )
            .with_context("path", path)
            .with_context("keys", &unknown),
        );
    }
    map.insert(
        "extensions".to_string(),
        serde_json::to_value(&extensions).unwrap_or(Value::Object(Default::default())),
    );
}

/// Pushes a warning [`Violation`] if `items`, keyed by `key_fn`, is not already sorted.
pub fn warn_if_not_sorted<T>(
    items: &[T],
    key_fn: impl Fn(&T) -> &str,
    list_label: &str,
    path: &str,
    violations: &mut Vec<Violation>,
) {
    let is_sorted = items.windows(2).all(|w| key_fn(&w[0]) <= key_fn(&w[1]));
    if !is_sorted {
        violations.push(
            Violation::new(
                ErrorCode::SchemaNotSorted,
                format!("{list_label} is not sorted by its natural key"),
                Severity::Warn,
            )
            .with_context("path", path),
        );
    }
}

/// Pushes an error [`Violation`] for every id in `ids` that repeats.
pub fn check_unique_ids(ids: &[&str], kind_label: &str, path: &str, violations: &mut Vec<Violation>) {
    let mut seen = std::collections::BTreeSet::new();
    let mut dupes = std::collections::BTreeSet::new();
    for id in ids {
        if !seen.insert(*id) {
            dupes.insert(*id);
        }
    }
    for id in dupes {
        violations.push(
            Violation::new(
                ErrorCode::IdDuplicate,
                format!("duplicate {kind_label} id {id:?}"),
                Severity::Error,
            )
            .with_context("path", path)
            .with_context("id", id),
        );
    }
}

/// Pushes an error [`Violation`] for every id in `ids` that fails [`psys_core::is_valid_id`].
pub fn check_id_grammar(ids: &[&str], kind_label: &str, path: &str, violations: &mut Vec<Violation>) {
    for id in ids {
        if !psys_core::is_valid_id(id) {
            violations.push(
                Violation::new(
                    ErrorCode::IdInvalid,
                    format!("{kind_label} id {id:?} does not match the identifier grammar"),
                    Severity::Error,
                )
                .with_context("path", path)
                .with_context("id", id),
            );
        }
    }
}
