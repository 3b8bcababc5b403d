// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-eval
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The orchestrator: one pass over a loaded corpus that builds the element index, composes
//! applicable bond rules per compound, evaluates every system's members, runs every negative
//! example, checks domain completeness and strategy-registry conformance, and assembles the
//! signed receipt. Every stage is a pure function of its loaded inputs — no stage reaches for an
//! ambient global, a clock, or a `static`; [`EvaluationContext`] and [`corpus::LoadedCorpus`] are
//! passed by reference through the whole pipeline.

/// Run configuration (profile, strictness, as-of date, trace flag).
pub mod context;
/// Corpus loading: resolves the index document and every document it names.
pub mod corpus;
/// Single-compound evaluation: element references, rule composition, obligations, waivers.
pub mod compound;
/// System evaluation: members, links, waivers, kappa, obligations commitment.
pub mod system;
/// Negative-example case runner.
pub mod negative;
/// Trace-entry construction and the explain-trace views, proof graph, safety envelope.
pub mod trace;
/// Receipt assembly.
pub mod receipt;
/// The final report shape.
pub mod report;

use std::collections::BTreeSet;
use std::path::Path;

use psys_core::hash_artifact;
use psys_error::PsysError;
use psys_index::ElementIndex;
use psys_policy::PackComposer;
use psys_trace::EntryKind;

pub use context::EvaluationContext;
pub use corpus::{load_corpus, LoadedCorpus};
pub use report::{partition, EvaluationReport, ReportEntry};

/// Runs one full evaluation pass over the corpus rooted at `index_path`.
///
/// `profile_uri` is recorded verbatim in the receipt's `policy.uri` — by convention the
/// `file://`-style path the profile document was loaded from.
///
/// # Errors
///
/// Propagates the first fatal [`PsysError`] raised while loading the corpus or any system/negative
/// example target, or while canonicalizing a trace view, the proof graph, the safety envelope, or
/// the receipt.
pub fn evaluate(
    index_path: &Path,
    ctx: &EvaluationContext,
    profile_uri: &str,
) -> Result<EvaluationReport, PsysError> {
    let corpus = load_corpus(ctx, index_path)?;
    let mut violations = corpus.violations.clone();

    let (index, index_violations) = ElementIndex::build(corpus.elements.clone());
    violations.extend(index_violations);
    violations.extend(index.validate_domain_declarations(ctx.strict));
    violations.extend(index.validate_element_cross_references(ctx.strict));

    let composer = PackComposer::new(
        &corpus.base_rules,
        &corpus.packs,
        &corpus.pack_rules,
        &corpus.domains,
    );
    violations.extend(composer.validate_packs());

    let declared_pack_ids: BTreeSet<String> = corpus.packs.iter().map(|p| p.id.clone()).collect();
    let source_packs = corpus.rule_source_packs();

    let profile_name = corpus.profile.name.clone();
    let mut trace_entries = Vec::new();
    let mut system_evaluations = Vec::new();

    for path in &corpus.system_paths {
        let evaluation = system::evaluate_system(
            path,
            &corpus,
            &index,
            &composer,
            &declared_pack_ids,
            &source_packs,
            ctx,
        )?;
        violations.extend(evaluation.violations.clone());

        for (alias, compound_eval) in &evaluation.compound_evaluations {
            if let Some(compound) = evaluation.compounds.get(alias) {
                trace_entries.extend(trace::build_entries(
                    &compound_eval.rule_outcomes,
                    compound,
                    EntryKind::System,
                    &profile_name,
                    profile_uri,
                ));
            }
        }

        system_evaluations.push(evaluation);
    }

    for case in &corpus.negative_examples.cases {
        violations.extend(negative::run_case(
            case,
            &corpus,
            &index,
            &composer,
            &declared_pack_ids,
            &source_packs,
            ctx,
        )?);
    }
    for case in &corpus.system_negative_examples.cases {
        violations.extend(negative::run_case(
            case,
            &corpus,
            &index,
            &composer,
            &declared_pack_ids,
            &source_packs,
            ctx,
        )?);
    }

    if ctx.strict {
        let (enabled, mut pack_violations) = composer.enabled_pack_ids(&corpus.profile);
        violations.append(&mut pack_violations);
        violations.extend(psys_negative::check_domain_completion(
            &corpus.domain_completion,
            &enabled,
            &corpus.golden_corpus,
            &corpus.negative_examples,
        ));
    }

    violations.extend(psys_strategy::check(&corpus.strategy_registry)?);

    let contract_hash = hash_artifact(&corpus.profile)?;
    let views = trace::build_views(
        trace_entries,
        &profile_name,
        &contract_hash,
        &corpus.spel_semantics,
        &corpus.domains,
    )?;

    let receipt = receipt::assemble(&corpus, &system_evaluations, &views, profile_uri)?;

    let mut entries: Vec<ReportEntry> = violations.into_iter().map(ReportEntry::Structural).collect();
    entries.extend(views.entries.iter().cloned().map(ReportEntry::Rule));

    let (ok, errors, warnings) = partition(entries, ctx.strict);

    Ok(EvaluationReport {
        ok,
        errors,
        warnings,
        trace: ctx.trace.then_some(views),
        receipt: Some(receipt),
    })
}
