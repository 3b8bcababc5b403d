// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluates a system document: loads its member compounds, evaluates each one, checks links,
//! waivers, and kappa-canonicalizes the system for the receipt's per-system commitment.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;

use psys_core::{hash_artifact, Compound, System};
use psys_error::{PsysError, Violation};
use psys_index::ElementIndex;
use psys_loader::loader;
use psys_policy::PackComposer;
use psys_system::{
    tag_member_violations, validate_links, validate_waivers, InProcessKappaTool, KappaOutput,
    KappaTool,
};

use crate::compound::{evaluate_compound, CompoundEvaluation};
use crate::context::EvaluationContext;
use crate::corpus::LoadedCorpus;

/// Outcome of evaluating one system document: every member's compound, its evaluation, every
/// violation raised (structural and member-tagged), the system's kappa canonicalization, and a
/// commitment hash over its unresolved obligations.
pub struct SystemEvaluation {
    /// The loaded system document.
    pub system: System,
    /// Member compounds, keyed by their system-scoped alias.
    pub compounds: BTreeMap<String, Compound>,
    /// Each member's compound-level evaluation, keyed by alias.
    pub compound_evaluations: BTreeMap<String, CompoundEvaluation>,
    /// Every violation raised evaluating this system, including member violations tagged with
    /// `system_id`/`alias` context.
    pub violations: Vec<Violation>,
    /// The system's canonicalized form and derived kappa hash.
    pub kappa: KappaOutput,
    /// `sha256(stable_stringify(unresolved obligations) + "\n")`, committed into the receipt.
    pub obligations_hash_sha256: String,
}

/// Loads and evaluates the system document at `path`: its members, links, waivers, and kappa.
///
/// # Errors
///
/// Propagates a fatal [`PsysError`] from loading the system document, any member compound, or
/// from kappa canonicalization / obligation hashing.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_system(
    path: &Path,
    corpus: &LoadedCorpus,
    index: &ElementIndex,
    composer: &PackComposer<'_>,
    declared_pack_ids: &BTreeSet<String>,
    source_packs: &BTreeMap<String, String>,
    ctx: &EvaluationContext,
) -> Result<SystemEvaluation, PsysError> {
    let loaded_system = loader::load_system(path)?;
    let system = loaded_system.value;
    let mut violations = loaded_system.violations;

    let mut compounds = BTreeMap::new();
    for member in &system.compounds {
        let loaded_compound = loader::load_compound(&corpus.resolve(&member.path))?;
        violations.extend(tag_member_violations(
            &system.id,
            &member.alias,
            loaded_compound.violations,
        ));
        compounds.insert(member.alias.clone(), loaded_compound.value);
    }

    let mut compound_evaluations = BTreeMap::new();
    for (alias, compound) in &compounds {
        let eval = evaluate_compound(
            compound,
            index,
            composer,
            &corpus.profile,
            &corpus.domains,
            &corpus.flow_workshop_pairs,
            declared_pack_ids,
            source_packs,
            ctx.strict,
            ctx.as_of,
        );
        violations.extend(tag_member_violations(
            &system.id,
            alias,
            eval.violations.clone(),
        ));
        violations.extend(tag_member_violations(
            &system.id,
            alias,
            crate::trace::expired_waiver_violations(&eval.rule_outcomes),
        ));
        compound_evaluations.insert(alias.clone(), eval);
    }

    let alias_to_compound: BTreeMap<String, &Compound> =
        compounds.iter().map(|(alias, c)| (alias.clone(), c)).collect();

    violations.extend(validate_links(
        &system,
        &alias_to_compound,
        index,
        &corpus.domains,
        &corpus.spel_semantics,
    ));
    violations.extend(validate_waivers(&system, &alias_to_compound));

    let kappa = InProcessKappaTool.canonicalize(&system)?;

    let obligations_hash_sha256 = hash_obligations(&compound_evaluations)?;

    Ok(SystemEvaluation {
        system,
        compounds,
        compound_evaluations,
        violations,
        kappa,
        obligations_hash_sha256,
    })
}

/// One unresolved obligation, committed into the system's obligations hash.
#[derive(Serialize)]
struct ObligationRecord<'a> {
    compound_alias: &'a str,
    rule_id: &'a str,
    missing_all_of: &'a [String],
    missing_any_of: &'a [String],
    missing_evidence_ids: &'a [String],
}

/// Hashes the sorted list of every member compound's unresolved obligations (rule misses that
/// [`RuleEvaluation::counts_as_violation`](psys_policy::RuleEvaluation::counts_as_violation)), so
/// the receipt commits to what a system still owes, not just what it passed.
fn hash_obligations(
    compound_evaluations: &BTreeMap<String, CompoundEvaluation>,
) -> Result<String, PsysError> {
    let mut records = Vec::new();
    for (alias, eval) in compound_evaluations {
        for outcome in &eval.rule_outcomes {
            if !outcome.evaluation.counts_as_violation() {
                continue;
            }
            let Some(obligation) = &outcome.evaluation.obligation else {
                continue;
            };
            records.push(ObligationRecord {
                compound_alias: alias.as_str(),
                rule_id: outcome.evaluation.rule_id.as_str(),
                missing_all_of: &obligation.missing_all_of,
                missing_any_of: &obligation.missing_any_of,
                missing_evidence_ids: &obligation.missing_evidence_ids,
            });
        }
    }
    records.sort_by(|a, b| {
        (a.compound_alias, a.rule_id).cmp(&(b.compound_alias, b.rule_id))
    });
    hash_artifact(&records)
}
