// SPDX-License-Identifier: MIT OR Apache-2.0
//! Obligation evaluation: whether a [`BondRule`]'s `require{}` clause is satisfied, and the
//! remediation plan to offer when it is not.

use psys_core::{Compound, Domain, RemediationAnyOfStrategy, RequireClause, Table};
use psys_index::ElementIndex;
use serde::Serialize;
use std::collections::BTreeSet;

/// Identifier of the implied element behind the `states` shorthand.
pub const TX_STATUS_ELEMENT_ID: &str = "exp.value.tx_status";

/// Suggested fix for an unmet obligation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Remediation {
    /// Elements to add to the compound: `missing_all_of` plus (if applicable) exactly one chosen
    /// id from `missing_any_of`.
    pub add_elements: Vec<String>,
    /// The subset of `add_elements` whose table is `evidence`.
    pub add_evidence_ids: Vec<String>,
    /// The id chosen out of `missing_any_of`, if that branch was unmet.
    pub any_of_choice: Option<String>,
    /// Which strategy picked `any_of_choice`, if any.
    pub tie_break: Option<&'static str>,
}

/// An unmet obligation, with enough structure to drive both the violation message and the
/// remediation trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Obligation {
    /// `require.all_of` ids not present in the compound.
    pub missing_all_of: Vec<String>,
    /// `require.any_of` ids, populated only when that whole branch is unmet.
    pub missing_any_of: Vec<String>,
    /// Deduped, sorted union of every element id named anywhere in `require{}`.
    pub obligation_ids: Vec<String>,
    /// Subset of `obligation_ids` whose element table is `evidence`.
    pub evidence_ids: Vec<String>,
    /// Subset of `evidence_ids` that is also missing.
    pub missing_evidence_ids: Vec<String>,
    /// Suggested fix.
    pub remediation: Remediation,
}

fn sorted_dedup(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items.dedup();
    items
}

/// Every element id named anywhere in `require{}` (`all_of` ∪ `any_of` ∪ state-requirement
/// element ids ∪ the implied `exp.value.tx_status` when `states` is used), deduped and sorted.
/// Used both by [`evaluate`]'s failure path and by the evidence-binding check on the passing
/// path, where the same id set still needs to be known.
#[must_use]
pub fn obligation_element_ids(require: &RequireClause) -> Vec<String> {
    let mut ids = Vec::new();
    ids.extend(require.all_of.iter().flatten().cloned());
    ids.extend(require.any_of.iter().flatten().cloned());
    ids.extend(require.state_requirements.iter().flatten().map(|sr| sr.element_id.clone()));
    if require.states.is_some() {
        ids.push(TX_STATUS_ELEMENT_ID.to_string());
    }
    sorted_dedup(ids)
}

/// Subset of `obligation_element_ids(require)` whose element table is `evidence`.
#[must_use]
pub fn evidence_element_ids(require: &RequireClause, index: &ElementIndex) -> Vec<String> {
    obligation_element_ids(require)
        .into_iter()
        .filter(|id| index.get(id).is_some_and(|e| e.table == Table::Evidence))
        .collect()
}

fn choose_any_of(candidates: &[String], index: &ElementIndex, strategy: RemediationAnyOfStrategy) -> (String, &'static str) {
    match strategy {
        RemediationAnyOfStrategy::LexicographicSmallest => (
            candidates.iter().min().cloned().unwrap_or_default(),
            "lexicographic_smallest",
        ),
        RemediationAnyOfStrategy::SafetyFirst => {
            let chosen = candidates
                .iter()
                .min_by_key(|id| {
                    let rank = index.get(id).map_or(u8::MAX, |e| e.table.safety_first_rank());
                    (rank, (*id).clone())
                })
                .cloned()
                .unwrap_or_default();
            (chosen, "safety_first")
        }
    }
}

/// Evaluates `require` against `compound`. Returns `None` when every present predicate holds;
/// otherwise returns the full [`Obligation`] describing what is missing and how to fix it.
///
/// `domain` is the compound's resolved domain (declared or unambiguously inferred), used only to
/// pick the `remediation_any_of_strategy`; `None` defaults to lexicographic tie-breaking.
#[must_use]
pub fn evaluate(require: &RequireClause, compound: &Compound, index: &ElementIndex, domain: Option<&Domain>) -> Option<Obligation> {
    let present: BTreeSet<&str> = compound.elements.iter().map(String::as_str).collect();

    let missing_all_of: Vec<String> = require
        .all_of
        .iter()
        .flatten()
        .filter(|id| !present.contains(id.as_str()))
        .cloned()
        .collect();

    let any_of_unmet = require
        .any_of
        .as_ref()
        .is_some_and(|ids| !ids.iter().any(|id| present.contains(id.as_str())));
    let missing_any_of: Vec<String> = if any_of_unmet {
        require.any_of.clone().unwrap_or_default()
    } else {
        Vec::new()
    };

    let mut missing_state_ids = Vec::new();
    let mut state_requirement_ids = Vec::new();
    for sr in require.state_requirements.iter().flatten() {
        state_requirement_ids.push(sr.element_id.clone());
        let covers = present.contains(sr.element_id.as_str())
            && index
                .get(&sr.element_id)
                .is_some_and(|e| sr.must_include.iter().all(|s| e.required_states.contains(s)));
        if !covers {
            missing_state_ids.push(sr.element_id.clone());
        }
    }

    let mut states_shorthand_missing = false;
    if let Some(states) = &require.states {
        state_requirement_ids.push(TX_STATUS_ELEMENT_ID.to_string());
        let covers = present.contains(TX_STATUS_ELEMENT_ID)
            && index
                .get(TX_STATUS_ELEMENT_ID)
                .is_some_and(|e| states.iter().all(|s| e.required_states.contains(s)));
        if !covers {
            states_shorthand_missing = true;
            missing_state_ids.push(TX_STATUS_ELEMENT_ID.to_string());
        }
    }

    let invariants_satisfied = require
        .invariants
        .as_ref()
        .is_none_or(|names| names.iter().all(|n| compound.invariants.contains(n)));

    let any_failed = !missing_all_of.is_empty()
        || any_of_unmet
        || !missing_state_ids.is_empty()
        || !invariants_satisfied;
    if !any_failed {
        return None;
    }
    let _ = states_shorthand_missing;

    let mut obligation_ids = Vec::new();
    obligation_ids.extend(require.all_of.iter().flatten().cloned());
    obligation_ids.extend(require.any_of.iter().flatten().cloned());
    obligation_ids.extend(state_requirement_ids);
    let obligation_ids = sorted_dedup(obligation_ids);

    let evidence_ids: Vec<String> = obligation_ids
        .iter()
        .filter(|id| index.get(id).is_some_and(|e| e.table == Table::Evidence))
        .cloned()
        .collect();

    let any_of_choice = if any_of_unmet && !missing_any_of.is_empty() {
        let strategy = domain
            .and_then(|d| d.remediation_any_of_strategy)
            .unwrap_or(RemediationAnyOfStrategy::LexicographicSmallest);
        Some(choose_any_of(&missing_any_of, index, strategy))
    } else {
        None
    };

    let mut add_elements = missing_all_of.clone();
    let mut tie_break = None;
    if let Some((chosen, label)) = &any_of_choice {
        add_elements.push(chosen.clone());
        tie_break = Some(*label);
    }
    let add_elements = sorted_dedup(add_elements);
    let add_evidence_ids: Vec<String> = add_elements
        .iter()
        .filter(|id| index.get(id).is_some_and(|e| e.table == Table::Evidence))
        .cloned()
        .collect();

    let missing_union: BTreeSet<&str> = missing_all_of
        .iter()
        .chain(missing_any_of.iter())
        .chain(missing_state_ids.iter())
        .map(String::as_str)
        .collect();
    let missing_evidence_ids: Vec<String> = evidence_ids
        .iter()
        .filter(|id| missing_union.contains(id.as_str()))
        .cloned()
        .collect();

    Some(Obligation {
        missing_all_of,
        missing_any_of,
        obligation_ids,
        evidence_ids,
        missing_evidence_ids,
        remediation: Remediation {
            add_elements,
            add_evidence_ids,
            any_of_choice: any_of_choice.map(|(id, _)| id),
            tie_break,
        },
    })
}
