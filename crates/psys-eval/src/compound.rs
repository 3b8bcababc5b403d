// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluates a single compound: element-reference validation, applicable-rule composition,
//! per-rule obligation/evidence/waiver evaluation, and domain federation.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use psys_core::{BondRule, Compound, DomainRegistry, Profile};
use psys_error::Violation;
use psys_index::ElementIndex;
use psys_loader::documents::FlowWorkshopPairs;
use psys_policy::{evaluate_rule, PackComposer, RuleEvaluation};
use psys_system::{
    infer_domain, validate_declared_domain, validate_flow_workshop_pairing, validate_immiscibility,
    validate_pack_enforcement, DomainInference,
};
use std::collections::BTreeSet;

/// One applicable rule, its evaluation outcome, and the pack it came from (for trace attribution).
pub struct RuleOutcome {
    /// The rule that was evaluated.
    pub rule: BondRule,
    /// Its outcome against this compound.
    pub evaluation: RuleEvaluation,
    /// `"base"` or the declaring pack's id.
    pub source_pack: String,
}

/// Outcome of evaluating one compound: every applicable rule's outcome, the compound's domain
/// inference, and every structural violation raised along the way (unresolved elements, domain
/// federation, flow/workshop pairing).
pub struct CompoundEvaluation {
    /// One entry per rule that applied to this compound (whether it triggered or not).
    pub rule_outcomes: Vec<RuleOutcome>,
    /// Structural violations: unresolved element ids, pack composition, domain federation,
    /// flow/workshop pairing.
    pub violations: Vec<Violation>,
    /// This compound's declared-vs-inferred domain outcome.
    pub inference: DomainInference,
}

/// Evaluates `compound` in isolation: validates its element references against `index`, composes
/// its applicable rules via `composer`, runs each through [`evaluate_rule`], and runs domain
/// federation checks.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_compound(
    compound: &Compound,
    index: &ElementIndex,
    composer: &PackComposer<'_>,
    profile: &Profile,
    domains: &DomainRegistry,
    pairs: &FlowWorkshopPairs,
    declared_pack_ids: &BTreeSet<String>,
    source_packs: &BTreeMap<String, String>,
    strict: bool,
    as_of: NaiveDate,
) -> CompoundEvaluation {
    let mut violations = Vec::new();
    let context_label = format!("compound {:?}", compound.id);

    for element_id in &compound.elements {
        if let Some(v) = index.validate_element_ref(element_id, strict, &context_label) {
            violations.push(v);
        }
    }

    let (rules, mut compose_violations) = composer.rules_for(compound, profile, index);
    violations.append(&mut compose_violations);

    let inference = infer_domain(composer, compound, index);
    violations.extend(validate_declared_domain(compound, &inference));
    violations.extend(validate_immiscibility(&compound.id, &inference, domains));
    violations.extend(validate_pack_enforcement(
        &compound.id,
        &inference,
        composer,
        profile,
        declared_pack_ids,
    ));
    violations.extend(validate_flow_workshop_pairing(compound, pairs));

    let domain = inference.single().and_then(|id| domains.get(id));

    let rule_outcomes: Vec<RuleOutcome> = rules
        .into_iter()
        .map(|rule| {
            let evaluation =
                evaluate_rule(rule, compound, index, profile, domain, &compound.waivers, as_of);
            let source_pack = source_packs
                .get(rule.id.as_str())
                .cloned()
                .unwrap_or_else(|| "base".to_string());
            RuleOutcome {
                rule: rule.clone(),
                evaluation,
                source_pack,
            }
        })
        .collect();

    CompoundEvaluation {
        rule_outcomes,
        violations,
        inference,
    }
}
