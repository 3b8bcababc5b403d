// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runs a negative-example case against its target compound or system and checks the outcome
//! against the case's declared expectations (§4.9).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use psys_error::{ErrorCode, PsysError, Violation};
use psys_index::ElementIndex;
use psys_loader::documents::NegativeExampleCase;
use psys_loader::loader;
use psys_negative::{check_case, CaseBuffer};
use psys_policy::PackComposer;

use crate::compound::evaluate_compound;
use crate::context::EvaluationContext;
use crate::corpus::LoadedCorpus;
use crate::system::evaluate_system;
use crate::trace::expired_waiver_violations;

/// Reads just the `"schema"` field of a JSON document, without deserializing the rest, to decide
/// whether a case's target is a compound or a system document.
fn peek_schema(path: &Path) -> Result<String, PsysError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        PsysError::fatal_at_path(
            ErrorCode::SchemaIo,
            format!("cannot read negative-example target: {e}"),
            path.display().to_string(),
        )
    })?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        PsysError::fatal_at_path(
            ErrorCode::SchemaIo,
            format!("negative-example target malformed: {e}"),
            path.display().to_string(),
        )
    })?;
    Ok(value
        .get("schema")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string())
}

/// Evaluates one negative-example case's target and checks the fired errors/warnings against
/// `case`'s `expect_errors`/`expect_warnings`.
///
/// # Errors
///
/// Propagates a fatal [`PsysError`] from loading the target document.
#[allow(clippy::too_many_arguments)]
pub fn run_case(
    case: &NegativeExampleCase,
    corpus: &LoadedCorpus,
    index: &ElementIndex,
    composer: &PackComposer<'_>,
    declared_pack_ids: &BTreeSet<String>,
    source_packs: &BTreeMap<String, String>,
    ctx: &EvaluationContext,
) -> Result<Vec<Violation>, PsysError> {
    let target_path = corpus.resolve(&case.path);
    let schema = peek_schema(&target_path)?;
    let mut buffer = CaseBuffer::new();

    if schema.contains("system") {
        let system_eval = evaluate_system(
            &target_path,
            corpus,
            index,
            composer,
            declared_pack_ids,
            source_packs,
            ctx,
        )?;
        for violation in &system_eval.violations {
            buffer.record_violation(violation);
        }
        for eval in system_eval.compound_evaluations.values() {
            for outcome in &eval.rule_outcomes {
                buffer.record_rule_evaluation(&outcome.evaluation);
            }
            for violation in &eval.violations {
                buffer.record_violation(violation);
            }
        }
    } else {
        let loaded_compound = loader::load_compound(&target_path)?;
        let compound = loaded_compound.value;
        for violation in &loaded_compound.violations {
            buffer.record_violation(violation);
        }

        let eval = evaluate_compound(
            &compound,
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
        for outcome in &eval.rule_outcomes {
            buffer.record_rule_evaluation(&outcome.evaluation);
        }
        for violation in &eval.violations {
            buffer.record_violation(violation);
        }
        for violation in expired_waiver_violations(&eval.rule_outcomes) {
            buffer.record_violation(&violation);
        }
    }

    Ok(check_case(case, &buffer, ctx.strict))
}
