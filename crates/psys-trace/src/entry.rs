// SPDX-License-Identifier: MIT OR Apache-2.0
//! Trace entries (§4.12): one per rule violation, collected from [`psys_policy::RuleEvaluation`]
//! plus the ambient context (profile, policy, compound) the rule was evaluated under.

use std::collections::BTreeMap;

use psys_core::{BondRule, Compound, RequireClause};
use psys_error::Severity;
use psys_policy::{Obligation, RuleEvaluation, WaiverScars};
use serde::Serialize;
use serde_json::Value;

/// Whether a trace entry was produced while evaluating a standalone compound or a compound
/// participating in a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Evaluated in isolation.
    Compound,
    /// Evaluated as a member of a system.
    System,
}

/// Ambient fields every trace entry in one evaluation run shares.
#[derive(Debug, Clone)]
pub struct TraceContext<'a> {
    /// Active profile name.
    pub profile: &'a str,
    /// Policy contract URI.
    pub policy_uri: &'a str,
    /// Compound-vs-system evaluation kind.
    pub kind: EntryKind,
    /// Compound id, when known.
    pub compound_id: Option<&'a str>,
    /// The pack id `rule` belongs to (`"base"` for ungrouped base rules).
    pub source_pack: &'a str,
}

/// A reference to the compound element that satisfies an evidence obligation.
#[derive(Debug, Clone, Serialize)]
pub struct ElementRef {
    /// Always `"compound_element"` at this evaluator's current provenance depth.
    pub kind: &'static str,
    /// The satisfying element's id.
    pub element_id: String,
}

/// One collected rule violation, with every field §4.12 names.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    /// Active profile name.
    pub profile: String,
    /// Policy contract URI.
    pub policy_uri: String,
    /// Compound-vs-system evaluation kind.
    pub kind: EntryKind,
    /// Compound id, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compound_id: Option<String>,
    /// The rule that fired.
    pub rule_id: String,
    /// Effective severity.
    pub severity: Severity,
    /// The rule's human-readable message.
    pub message: String,
    /// What matched in `when{}`, as an opaque JSON value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub because: Option<Value>,
    /// What failed in `require{}`, as an opaque JSON value (`{kind: "obligation_miss", ...}` or
    /// `{kind: "evidence_binding_missing", ...}`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atom: Option<Value>,
    /// The rule's `require{}` clause verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires: Option<Value>,
    /// Suggested fix, as an opaque JSON value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Value>,
    /// Full obligation-miss detail, when the failure came from the obligation engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obligations: Option<Obligation>,
    /// Evidence-table element ids this obligation required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<String>>,
    /// Evidence id → satisfying compound elements (omits ids still missing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_satisfied_by: Option<BTreeMap<String, Vec<ElementRef>>>,
    /// Pack id this rule belongs to.
    pub source_pack: String,
    /// `true` if a live waiver suppressed this violation.
    pub waived: bool,
    /// Waiver audit record, when a waiver (live or expired) matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiver_scars: Option<WaiverScars>,
}

/// Builds a [`TraceEntry`] from a rule evaluation outcome. Returns `None` when the rule produced
/// no violation at all (it never triggered, or every obligation was met).
#[must_use]
pub fn build(rule: &BondRule, eval: &RuleEvaluation, compound: &Compound, ctx: &TraceContext<'_>) -> Option<TraceEntry> {
    if eval.passed() {
        return None;
    }

    let because = eval.because.as_ref().and_then(|b| serde_json::to_value(b).ok());
    let requires = serde_json::to_value(&rule.require).ok();

    let (atom, remediation, evidence, evidence_satisfied_by) = if let Some(obligation) = &eval.obligation {
        let atom = serde_json::json!({
            "kind": "obligation_miss",
            "missing_all_of": obligation.missing_all_of,
            "missing_any_of": obligation.missing_any_of,
            "obligation_ids": obligation.obligation_ids,
            "evidence_ids": obligation.evidence_ids,
            "missing_evidence_ids": obligation.missing_evidence_ids,
        });
        let remediation = serde_json::to_value(&obligation.remediation).ok();
        let evidence = if obligation.evidence_ids.is_empty() {
            None
        } else {
            Some(obligation.evidence_ids.clone())
        };
        let satisfied_by = evidence_satisfied_by_map(obligation);
        (Some(atom), remediation, evidence, satisfied_by)
    } else if let Some(evidence_violation) = &eval.evidence_violation {
        let atom = serde_json::json!({
            "kind": "evidence_binding_missing",
            "rule_id": evidence_violation.rule_id,
            "bind_evidence_ids": evidence_violation.bind_evidence_ids,
        });
        let remediation = serde_json::json!({
            "kind": "bind_evidence_to_rule",
            "rule_id": evidence_violation.rule_id,
            "bind_evidence_ids": evidence_violation.bind_evidence_ids,
        });
        (Some(atom), Some(remediation), None, None)
    } else {
        (None, None, None, None)
    };

    Some(TraceEntry {
        profile: ctx.profile.to_string(),
        policy_uri: ctx.policy_uri.to_string(),
        kind: ctx.kind,
        compound_id: ctx.compound_id.map(str::to_string).or_else(|| Some(compound.id.clone())),
        rule_id: rule.id.clone(),
        severity: eval.severity,
        message: rule.message.clone(),
        because,
        atom,
        requires,
        remediation,
        obligations: eval.obligation.clone(),
        evidence,
        evidence_satisfied_by,
        source_pack: ctx.source_pack.to_string(),
        waived: eval.waived,
        waiver_scars: eval.waiver_scars.clone(),
    })
}

fn evidence_satisfied_by_map(obligation: &Obligation) -> Option<BTreeMap<String, Vec<ElementRef>>> {
    if obligation.evidence_ids.is_empty() {
        return None;
    }
    let missing: std::collections::BTreeSet<&str> =
        obligation.missing_evidence_ids.iter().map(String::as_str).collect();
    let mut map = BTreeMap::new();
    for id in &obligation.evidence_ids {
        let satisfiers = if missing.contains(id.as_str()) {
            Vec::new()
        } else {
            vec![ElementRef {
                kind: "compound_element",
                element_id: id.clone(),
            }]
        };
        map.insert(id.clone(), satisfiers);
    }
    Some(map)
}

/// Canonical sort over a collection of entries, per §4.12: the tuple `(profile, severity, kind,
/// rule_id, compound_id, waived, source_pack, policy_uri, stable_stringify(atom),
/// stable_stringify(requires), stable_stringify(obligations), stable_stringify(evidence),
/// stable_stringify(remediation), stable_stringify(waiver_scars), message)`, compared as strings.
pub fn sort_entries(entries: &mut [TraceEntry]) {
    entries.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

fn sort_key(e: &TraceEntry) -> Vec<String> {
    vec![
        e.profile.clone(),
        e.severity.to_string(),
        kind_str(e.kind).to_string(),
        e.rule_id.clone(),
        e.compound_id.clone().unwrap_or_default(),
        e.waived.to_string(),
        e.source_pack.clone(),
        e.policy_uri.clone(),
        stringify_opt(&e.atom),
        stringify_opt(&e.requires),
        e.obligations
            .as_ref()
            .map(psys_core::stable_stringify)
            .transpose()
            .ok()
            .flatten()
            .unwrap_or_default(),
        e.evidence
            .as_ref()
            .map(psys_core::stable_stringify)
            .transpose()
            .ok()
            .flatten()
            .unwrap_or_default(),
        stringify_opt(&e.remediation),
        e.waiver_scars
            .as_ref()
            .map(psys_core::stable_stringify)
            .transpose()
            .ok()
            .flatten()
            .unwrap_or_default(),
        e.message.clone(),
    ]
}

fn stringify_opt(v: &Option<Value>) -> String {
    v.as_ref().map(psys_core::stable_stringify_value).unwrap_or_default()
}

fn kind_str(k: EntryKind) -> &'static str {
    match k {
        EntryKind::Compound => "compound",
        EntryKind::System => "system",
    }
}
