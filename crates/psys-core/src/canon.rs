// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical JSON serialization and SHA-256 helpers.
//!
//! `stable_stringify` walks a [`serde_json::Value`] tree and, at every object, sorts entries by
//! `localeCompare` order — lexicographic comparison of UTF-16 code units. This is stricter than
//! relying on `serde_json`'s own map ordering: plain `serde_json::to_string` only guarantees
//! insertion order (or, with the `preserve_order` feature, whatever order the caller built the map
//! in), neither of which is the sort this data model's hashes are defined over.

use psys_error::{ErrorCode, PsysError};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize `value` to canonical JSON text: object keys sorted by UTF-16 code-unit order,
/// arrays left in the order given, leaves unchanged.
///
/// # Errors
///
/// Returns [`PsysError`] with [`ErrorCode::SchemaIo`] if `value` cannot be represented as JSON
/// (e.g. a non-finite float, or a serializer failure).
pub fn stable_stringify<T: Serialize>(value: &T) -> Result<String, PsysError> {
    let v = serde_json::to_value(value).map_err(|e| {
        PsysError::new(ErrorCode::SchemaIo, format!("value is not serializable: {e}"))
    })?;
    let mut out = String::new();
    write_canonical(&v, &mut out);
    Ok(out)
}

/// Same as [`stable_stringify`], but operating directly on an already-built [`Value`].
#[must_use]
pub fn stable_stringify_value(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(v: &Value, out: &mut String) {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
            out.push('{');
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(k, out);
                out.push(':');
                write_canonical(&map[*k], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Leaves: serde_json already renders numbers/strings/bools/null deterministically.
        other => {
            out.push_str(&serde_json::to_string(other).expect("leaf values always serialize"));
        }
    }
}

fn write_json_string(s: &str, out: &mut String) {
    let encoded = serde_json::to_string(s).expect("strings always serialize");
    out.push_str(&encoded);
}

/// Hex-encoded (lowercase) SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash an artifact the way every hashed artifact in this crate is hashed:
/// `sha256_hex(stable_stringify(value) + "\n")`.
///
/// # Errors
///
/// Propagates [`stable_stringify`]'s error.
pub fn hash_artifact<T: Serialize>(value: &T) -> Result<String, PsysError> {
    let mut text = stable_stringify(value)?;
    text.push('\n');
    Ok(sha256_hex(text.as_bytes()))
}
