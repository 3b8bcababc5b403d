// SPDX-License-Identifier: MIT OR Apache-2.0
//! κ(index) (§4.15): the loaded index document with its volatile wiring fields stripped, then
//! canonically hashed. Distinct from `psys_system::kappa`'s system-graph κ — this canonicalizes
//! the index document itself, not a compound/system graph.

use psys_error::{ErrorCode, PsysError};
use psys_loader::Index;

/// Fields stripped from the index before hashing: these are paths to other documents (and, for
/// `systems`, a directory), not part of the policy surface a receipt should commit to.
const VOLATILE_FIELDS: &[&str] = &["examples", "negative_examples", "system_negative_examples", "systems"];

/// Strips [`VOLATILE_FIELDS`] from `index`, canonically stringifies the remainder, and hashes it.
///
/// Returns the stripped value alongside its hash so callers can embed either in a receipt.
///
/// # Errors
///
/// Returns [`PsysError`] if `index` does not serialize to a JSON object (never happens for a
/// well-formed [`Index`]), or if canonicalization fails.
pub fn kappa_index(index: &Index) -> Result<(serde_json::Value, String), PsysError> {
    let mut value = serde_json::to_value(index)
        .map_err(|e| PsysError::new(ErrorCode::SchemaIo, format!("index not serializable: {e}")))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| PsysError::new(ErrorCode::SchemaIo, "index document did not serialize to an object"))?;
    for field in VOLATILE_FIELDS {
        object.remove(*field);
    }
    let hash = psys_core::hash_artifact(&value)?;
    Ok((value, hash))
}
