// SPDX-License-Identifier: MIT OR Apache-2.0
//! Domain-completion gate (§4.10): every pack declared `complete` must carry a non-empty rule
//! list and meet a minimum quorum of positive and negative examples.

use std::collections::BTreeSet;

use psys_error::{ErrorCode, Severity, Violation};
use psys_loader::documents::{DomainCompletion, GoldenCorpus, NegativeExampleCase, NegativeExamples};

const COMPLETE: &str = "complete";

/// Checks every pack in `completion` whose `status` is `"complete"` against the global corpora.
///
/// `enabled_packs` restricts the gate to packs actually in play for this run; a `complete` pack
/// outside that set is skipped rather than reported, since the gate evaluates readiness of packs
/// the run actually exercises.
///
/// A negative example counts toward a pack's quorum if any id in its `expect_errors`/
/// `expect_warnings` belongs to that pack's declared `rules` list. `NegativeExampleCase` carries
/// no `packs` field of its own (unlike [`psys_loader::documents::GoldenExample`]), so pack
/// membership for negative examples is inferred from the rules it demonstrably exercises.
#[must_use]
pub fn check(
    completion: &DomainCompletion,
    enabled_packs: &BTreeSet<String>,
    golden: &GoldenCorpus,
    negative: &NegativeExamples,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (pack_id, entry) in &completion.packs {
        if entry.status != COMPLETE || !enabled_packs.contains(pack_id) {
            continue;
        }

        if entry.rules.is_empty() {
            violations.push(
                Violation::new(
                    ErrorCode::DomainCompletionMissingRules,
                    format!("pack {pack_id} is declared complete but lists no rules"),
                    Severity::Error,
                )
                .with_context("pack_id", pack_id),
            );
            continue;
        }

        let rules: BTreeSet<&str> = entry.rules.iter().map(String::as_str).collect();

        let positive = golden
            .examples
            .iter()
            .filter(|ex| ex.packs.iter().any(|p| p == pack_id))
            .count();
        let negative_count = negative
            .cases
            .iter()
            .filter(|case| case_exercises_pack(case, &rules))
            .count();

        if (positive as u32) < entry.min_positive_examples {
            violations.push(
                Violation::new(
                    ErrorCode::DomainCompletionInsufficientPositive,
                    format!(
                        "pack {pack_id} has {positive} positive example(s), needs {}",
                        entry.min_positive_examples
                    ),
                    Severity::Error,
                )
                .with_context("pack_id", pack_id)
                .with_context("found", positive)
                .with_context("required", entry.min_positive_examples),
            );
        }
        if (negative_count as u32) < entry.min_negative_examples {
            violations.push(
                Violation::new(
                    ErrorCode::DomainCompletionInsufficientNegative,
                    format!(
                        "pack {pack_id} has {negative_count} negative example(s), needs {}",
                        entry.min_negative_examples
                    ),
                    Severity::Error,
                )
                .with_context("pack_id", pack_id)
                .with_context("found", negative_count)
                .with_context("required", entry.min_negative_examples),
            );
        }
    }

    for pack_id in enabled_packs {
        if !completion.packs.contains_key(pack_id) {
            violations.push(
                Violation::new(
                    ErrorCode::DomainCompletionMissingEntry,
                    format!("pack {pack_id} has no domain_completion entry"),
                    Severity::Warn,
                )
                .with_context("pack_id", pack_id),
            );
        }
    }

    violations
}

fn case_exercises_pack(case: &NegativeExampleCase, rules: &BTreeSet<&str>) -> bool {
    case.expect_errors
        .iter()
        .chain(case.expect_warnings.iter())
        .any(|id| rules.contains(id.as_str()))
}
