// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evidence binding (§4.6.1): in `explicit_only` mode, an otherwise-satisfied rule still fails
//! unless every evidence obligation is explicitly bound to it.

use psys_core::{BondRule, Compound, EvidenceBindingMode};
use serde::Serialize;

/// A rule that passed ordinary obligation checking but fails evidence binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceBindingViolation {
    /// The rule that failed binding.
    pub rule_id: String,
    /// Evidence element ids the compound must add to `evidence_bindings[rule_id]`.
    pub bind_evidence_ids: Vec<String>,
}

/// Checks whether `rule`'s evidence obligations (`evidence_ids`, from the already-passed
/// obligation check) are all explicitly bound, when `compound` uses `explicit_only` binding.
/// Returns `None` when binding is not required or already satisfied.
#[must_use]
pub fn check(rule: &BondRule, compound: &Compound, evidence_ids: &[String]) -> Option<EvidenceBindingViolation> {
    if compound.evidence_binding_mode != EvidenceBindingMode::ExplicitOnly || evidence_ids.is_empty() {
        return None;
    }
    let bound = compound.evidence_bindings.get(&rule.id);
    let mut missing: Vec<String> = evidence_ids
        .iter()
        .filter(|id| !bound.is_some_and(|b| b.contains(*id)))
        .cloned()
        .collect();
    if missing.is_empty() {
        return None;
    }
    missing.sort();
    missing.dedup();
    Some(EvidenceBindingViolation {
        rule_id: rule.id.clone(),
        bind_evidence_ids: missing,
    })
}
