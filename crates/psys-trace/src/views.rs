// SPDX-License-Identifier: MIT OR Apache-2.0
//! Progressively richer JSON views of a canonically-sorted trace (§4.12: v2, v3, v6, v6.1, v6.2),
//! each with its own stable hash.

use psys_error::PsysError;
use serde_json::{json, Value};

use crate::entry::TraceEntry;

/// One view plus its hash: `sha256_hex(stable_stringify(view) + "\n")`.
#[derive(Debug, Clone)]
pub struct HashedView {
    /// The view's JSON body.
    pub view: Value,
    /// Its stable hash.
    pub hash_sha256: String,
}

fn hashed(view: Value) -> Result<HashedView, PsysError> {
    let hash_sha256 = psys_core::hash_artifact(&view)?;
    Ok(HashedView { view, hash_sha256 })
}

fn v2_entry(e: &TraceEntry) -> Value {
    json!({
        "profile": e.profile,
        "policy": { "uri": e.policy_uri },
        "kind": e.kind,
        "target": { "compound_id": e.compound_id },
        "rule_id": e.rule_id,
        "severity": e.severity,
        "fired_because": { "because": e.because, "atom": e.atom },
        "requires": e.requires,
        "obligations": e.obligations,
        "evidence": e.evidence,
        "remediation": e.remediation,
        "source_pack": e.source_pack,
        "waived": e.waived,
        "waiver_scars": e.waiver_scars,
        "message": e.message,
    })
}

/// Builds the v2 view: entries remapped into the nested `policy`/`target`/`fired_because` shape.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn build_v2(entries: &[TraceEntry]) -> Result<HashedView, PsysError> {
    let view = json!({ "entries": entries.iter().map(v2_entry).collect::<Vec<_>>() });
    hashed(view)
}

/// Builds the v3 view: v2 plus `policy.digest.sha256`/`policy.semantics_digest.sha256` and a
/// top-level `v:3`.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn build_v3(entries: &[TraceEntry], profile_contract_hash: &str, semantics_digest: &str) -> Result<HashedView, PsysError> {
    let entries: Vec<Value> = entries
        .iter()
        .map(|e| {
            let mut v = v2_entry(e);
            v["policy"]["digest"] = json!({ "sha256": profile_contract_hash });
            v["policy"]["semantics_digest"] = json!({ "sha256": semantics_digest });
            v
        })
        .collect();
    hashed(json!({ "v": 3, "entries": entries }))
}

/// Builds the v6 view: v3 plus the evidence closure and `evidence_satisfied_by[]`.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn build_v6(entries: &[TraceEntry], profile_contract_hash: &str, semantics_digest: &str) -> Result<HashedView, PsysError> {
    let entries: Vec<Value> = entries
        .iter()
        .map(|e| {
            let mut v = v2_entry(e);
            v["policy"]["digest"] = json!({ "sha256": profile_contract_hash });
            v["policy"]["semantics_digest"] = json!({ "sha256": semantics_digest });

            let missing_evidence_ids = e.obligations.as_ref().map(|o| o.missing_evidence_ids.clone()).unwrap_or_default();
            let missing_evidence_binding_ids = e
                .atom
                .as_ref()
                .and_then(|a| a.get("bind_evidence_ids"))
                .cloned()
                .unwrap_or_else(|| json!([]));
            v["closure"] = json!({
                "evidence_complete": missing_evidence_ids.is_empty(),
                "missing_evidence_ids": missing_evidence_ids,
                "missing_evidence_binding_ids": missing_evidence_binding_ids,
            });
            v["evidence_satisfied_by"] = satisfied_by_array(e);
            v
        })
        .collect();
    hashed(json!({ "v": 6, "entries": entries }))
}

fn satisfied_by_array(e: &TraceEntry) -> Value {
    let Some(map) = &e.evidence_satisfied_by else {
        return json!([]);
    };
    let items: Vec<Value> = map
        .iter()
        .map(|(evidence_id, satisfiers)| {
            json!({
                "evidence_id": evidence_id,
                "satisfied_by": satisfiers,
            })
        })
        .collect();
    Value::Array(items)
}

/// Builds the v6.1 view: v6 plus per-mapping provenance fields and a `justification_hash_sha256`
/// per mapping.
///
/// This evaluator does not track cross-context/membrane-edge derivation chains, so
/// `context_id`/`membrane_edge_id`/`inference_rule_id`/`parent_evidence_id` are always `null` and
/// `derivation_steps` is always empty — the view's shape is built faithfully so a future
/// provenance-tracking feature can populate them without changing the contract.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn build_v6_1(entries: &[TraceEntry], profile_contract_hash: &str, semantics_digest: &str) -> Result<HashedView, PsysError> {
    let v6 = build_v6(entries, profile_contract_hash, semantics_digest)?.view;
    let mut v6 = v6;
    v6["v"] = json!("6.1");
    if let Some(entries) = v6["entries"].as_array_mut() {
        for entry in entries {
            if let Some(mappings) = entry["evidence_satisfied_by"].as_array_mut() {
                for mapping in mappings {
                    enrich_mapping_v6_1(mapping)?;
                }
            }
        }
    }
    hashed(v6)
}

fn enrich_mapping_v6_1(mapping: &mut Value) -> Result<(), PsysError> {
    let provenance = json!({
        "context_id": Value::Null,
        "membrane_edge_id": Value::Null,
        "inference_rule_id": Value::Null,
        "parent_evidence_id": Value::Null,
    });
    let justification_hash_sha256 = psys_core::hash_artifact(&provenance)?;
    if let Value::Object(map) = mapping {
        map.insert("context_id".into(), Value::Null);
        map.insert("membrane_edge_id".into(), Value::Null);
        map.insert("inference_rule_id".into(), Value::Null);
        map.insert("parent_evidence_id".into(), Value::Null);
        map.insert("justification_hash_sha256".into(), json!(justification_hash_sha256));
        map.insert("derivation_steps".into(), json!([]));
    }
    Ok(())
}

/// Builds the v6.2 view: v6.1 plus per-mapping `artifact_refs[]` and a top-level
/// `requires_evidence[]` alias.
///
/// No artifact-verification system exists in this evaluator, so `artifact_refs` is always empty.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn build_v6_2(entries: &[TraceEntry], profile_contract_hash: &str, semantics_digest: &str) -> Result<HashedView, PsysError> {
    let v6_1 = build_v6_1(entries, profile_contract_hash, semantics_digest)?.view;
    let mut v6_1 = v6_1;
    v6_1["v"] = json!("6.2");
    let mut requires_evidence: Vec<String> = Vec::new();
    if let Some(json_entries) = v6_1["entries"].as_array_mut() {
        for (entry, src) in json_entries.iter_mut().zip(entries.iter()) {
            if let Some(ev) = &src.evidence {
                requires_evidence.extend(ev.iter().cloned());
            }
            if let Some(mappings) = entry["evidence_satisfied_by"].as_array_mut() {
                for mapping in mappings {
                    if let Value::Object(map) = mapping {
                        map.insert("artifact_refs".into(), json!([]));
                    }
                }
            }
        }
    }
    requires_evidence.sort();
    requires_evidence.dedup();
    v6_1["requires_evidence"] = json!(requires_evidence);
    hashed(v6_1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use psys_error::Severity;

    fn entry() -> TraceEntry {
        TraceEntry {
            profile: "ship".into(),
            policy_uri: "policy://ship".into(),
            kind: EntryKind::Compound,
            compound_id: Some("comp.x".into()),
            rule_id: "r.a".into(),
            severity: Severity::Error,
            message: "needs evi.b".into(),
            because: None,
            atom: Some(json!({"kind": "obligation_miss", "missing_all_of": ["evi.b"]})),
            requires: None,
            remediation: None,
            obligations: None,
            evidence: Some(vec!["evi.b".into()]),
            evidence_satisfied_by: Some(
                [("evi.b".to_string(), vec![crate::entry::ElementRef { kind: "compound_element", element_id: "evi.b".into() }])]
                    .into_iter()
                    .collect(),
            ),
            source_pack: "base".into(),
            waived: false,
            waiver_scars: None,
        }
    }

    #[test]
    fn v3_carries_policy_digests_and_version() {
        let v = build_v3(&[entry()], "deadbeef", "cafebabe").unwrap();
        assert_eq!(v.view["v"], 3);
        assert_eq!(v.view["entries"][0]["policy"]["digest"]["sha256"], "deadbeef");
    }

    #[test]
    fn v6_1_version_label_is_a_string_not_a_float() {
        let v = build_v6_1(&[entry()], "d", "s").unwrap();
        assert_eq!(v.view["v"], json!("6.1"));
    }

    #[test]
    fn v6_2_exposes_requires_evidence_alias() {
        let v = build_v6_2(&[entry()], "d", "s").unwrap();
        assert_eq!(v.view["requires_evidence"], json!(["evi.b"]));
        assert_eq!(v.view["v"], json!("6.2"));
    }

    #[test]
    fn hashes_are_stable_across_calls() {
        let a = build_v2(&[entry()]).unwrap();
        let b = build_v2(&[entry()]).unwrap();
        assert_eq!(a.hash_sha256, b.hash_sha256);
    }
}
