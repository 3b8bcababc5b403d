// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ties the predicate engine, obligation engine, evidence binding, severity resolution, and
//! waivers together into a single per-rule-per-compound evaluation.

use chrono::NaiveDate;
use psys_core::{BondRule, Compound, Domain};
use psys_error::Severity;
use psys_index::ElementIndex;

use crate::evidence::{self, EvidenceBindingViolation};
use crate::obligation::{self, Obligation};
use crate::predicate::{self, BecauseTrace};
use crate::waiver::{self, WaiverResolution, WaiverScars, COMPOUND_TARGET};

/// Full outcome of evaluating one [`BondRule`] against one [`Compound`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEvaluation {
    /// The rule's id, for convenience.
    pub rule_id: String,
    /// Whether `when{}` matched at all.
    pub triggered: bool,
    /// What matched, when triggered.
    pub because: Option<BecauseTrace>,
    /// Effective severity after profile override.
    pub severity: Severity,
    /// Unmet obligation, if `require{}` failed.
    pub obligation: Option<Obligation>,
    /// Evidence-binding failure, if `require{}` passed but binding did not.
    pub evidence_violation: Option<EvidenceBindingViolation>,
    /// `true` if a live waiver suppressed this rule's violation.
    pub waived: bool,
    /// Waiver audit record, present whenever a waiver matched (live or expired).
    pub waiver_scars: Option<WaiverScars>,
    /// `true` if the matched waiver had already expired as of `as_of` (itself a reportable
    /// error, distinct from the rule's own violation).
    pub waiver_expired: bool,
}

impl RuleEvaluation {
    /// `true` if this rule produced no violation at all: either it never triggered, or it
    /// triggered and every obligation (including evidence binding) passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.triggered || (self.obligation.is_none() && self.evidence_violation.is_none())
    }

    /// `true` if this rule's violation should count toward `errors`/`warnings`: it failed,
    /// its effective severity is not `Ignore`, and no live waiver suppressed it.
    #[must_use]
    pub fn counts_as_violation(&self) -> bool {
        !self.passed() && self.severity != Severity::Ignore && !self.waived
    }
}

/// Evaluates `rule` against `compound`. `domain` is the compound's resolved domain (used only for
/// the obligation engine's remediation tie-break). `waivers` should be `compound.waivers` scoped
/// to the `"compound"` target.
#[must_use]
pub fn evaluate_rule<'a>(
    rule: &BondRule,
    compound: &Compound,
    index: &ElementIndex,
    profile: &psys_core::Profile,
    domain: Option<&Domain>,
    waivers: impl IntoIterator<Item = &'a psys_core::Waiver>,
    as_of: NaiveDate,
) -> RuleEvaluation {
    let trigger = predicate::triggered(rule, compound, index);
    let severity = crate::severity::resolve(rule, profile);

    if !trigger.triggered {
        return RuleEvaluation {
            rule_id: rule.id.clone(),
            triggered: false,
            because: None,
            severity,
            obligation: None,
            evidence_violation: None,
            waived: false,
            waiver_scars: None,
            waiver_expired: false,
        };
    }

    let obligation = obligation::evaluate(&rule.require, compound, index, domain);
    let evidence_violation = if obligation.is_none() {
        let evidence_ids = obligation::evidence_element_ids(&rule.require, index);
        evidence::check(rule, compound, &evidence_ids)
    } else {
        None
    };

    let failed = obligation.is_some() || evidence_violation.is_some();
    let (waived, waiver_scars, waiver_expired) = if failed {
        match waiver::resolve(&rule.id, COMPOUND_TARGET, waivers, as_of) {
            WaiverResolution::NotWaived => (false, None, false),
            WaiverResolution::Suppressed(scars) => (true, Some(scars), false),
            WaiverResolution::Expired(scars) => (false, Some(scars), true),
        }
    } else {
        (false, None, false)
    };

    RuleEvaluation {
        rule_id: rule.id.clone(),
        triggered: true,
        because: Some(trigger.because),
        severity,
        obligation,
        evidence_violation,
        waived,
        waiver_scars,
        waiver_expired,
    }
}
