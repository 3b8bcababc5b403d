// SPDX-License-Identifier: MIT OR Apache-2.0
//! Case-local violation buffer and expectation matching for negative examples (§4.9).
//!
//! Grounded on the donor's [`abp-policy::audit::PolicyAuditor`] pattern: wrap an evaluation,
//! record every outcome through a single private method, expose read-only summaries. Here the
//! "engine" being wrapped is a single negative-example case rather than a whole session, so there
//! is no `timestamp: DateTime<Utc>` field to carry over — a per-case buffer that will be hashed
//! into a trace has no business recording wall-clock time.

use std::collections::BTreeSet;

use psys_error::{ErrorCode, Severity, Violation};
use psys_loader::documents::NegativeExampleCase;
use psys_policy::RuleEvaluation;

/// Accumulates the errors and warnings produced while evaluating a single negative-example case,
/// keyed by the id that fired: a bond rule's `rule_id` for rule evaluations, or an
/// [`ErrorCode`]'s canonical string for structural violations raised outside the rule engine
/// (domain federation, system links, schema/reference checks, and so on).
#[derive(Debug, Clone, Default)]
pub struct CaseBuffer {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl CaseBuffer {
    /// An empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a bond-rule outcome. Ignored unless it [`RuleEvaluation::counts_as_violation`].
    pub fn record_rule_evaluation(&mut self, eval: &RuleEvaluation) {
        if !eval.counts_as_violation() {
            return;
        }
        self.record(eval.rule_id.clone(), eval.severity);
    }

    /// Records a structural violation, keyed by its [`ErrorCode`]'s canonical string.
    pub fn record_violation(&mut self, violation: &Violation) {
        self.record(violation.code.as_str().to_string(), violation.severity);
    }

    fn record(&mut self, id: String, severity: Severity) {
        match severity {
            Severity::Error => self.errors.push(id),
            Severity::Warn => self.warnings.push(id),
            Severity::Ignore => {}
        }
    }

    /// Ids that fired at error severity.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Ids that fired at warning severity.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// `true` if nothing fired at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Checks a filled-in [`CaseBuffer`] against a negative-example case's expectations.
///
/// An empty buffer is itself a failure: the case is supposed to demonstrate a violation. Every
/// expected id must appear among the fired ids of the matching severity. When `strict` is set,
/// any fired id the case did not list in either `expect_errors` or `expect_warnings` is also a
/// failure (purity: only the expected ids may fire).
#[must_use]
pub fn check_case(case: &NegativeExampleCase, buffer: &CaseBuffer, strict: bool) -> Vec<Violation> {
    let mut violations = Vec::new();

    if buffer.is_empty() {
        violations.push(
            Violation::new(
                ErrorCode::NegativeExampleExpectedFailureButPassed,
                format!("case {} expected a failure but the evaluation passed", case.id),
                Severity::Error,
            )
            .with_context("case_id", &case.id)
            .with_context("path", &case.path),
        );
        return violations;
    }

    let fired_errors: BTreeSet<&str> = buffer.errors().iter().map(String::as_str).collect();
    let fired_warnings: BTreeSet<&str> = buffer.warnings().iter().map(String::as_str).collect();

    for expected in &case.expect_errors {
        if !fired_errors.contains(expected.as_str()) {
            violations.push(not_found(case, expected, "error"));
        }
    }
    for expected in &case.expect_warnings {
        if !fired_warnings.contains(expected.as_str()) {
            violations.push(not_found(case, expected, "warning"));
        }
    }

    if strict {
        let expected_errors: BTreeSet<&str> = case.expect_errors.iter().map(String::as_str).collect();
        let expected_warnings: BTreeSet<&str> = case.expect_warnings.iter().map(String::as_str).collect();
        for fired in fired_errors.iter().chain(fired_warnings.iter()) {
            if !expected_errors.contains(fired) && !expected_warnings.contains(fired) {
                violations.push(
                    Violation::new(
                        ErrorCode::NegativeExampleUnexpectedRuleFired,
                        format!("case {} unexpectedly fired {fired}", case.id),
                        Severity::Error,
                    )
                    .with_context("case_id", &case.id)
                    .with_context("rule_id", *fired),
                );
            }
        }
    }

    violations
}

fn not_found(case: &NegativeExampleCase, expected: &str, kind: &str) -> Violation {
    Violation::new(
        ErrorCode::NegativeExampleRuleNotFound,
        format!("case {} expected {kind} {expected} but it did not fire", case.id),
        Severity::Error,
    )
    .with_context("case_id", &case.id)
    .with_context("rule_id", expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, expect_errors: &[&str], expect_warnings: &[&str]) -> NegativeExampleCase {
        NegativeExampleCase {
            id: id.into(),
            path: format!("{id}.json"),
            expect_errors: expect_errors.iter().map(|s| s.to_string()).collect(),
            expect_warnings: expect_warnings.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn rule_eval(rule_id: &str, severity: Severity) -> RuleEvaluation {
        RuleEvaluation {
            rule_id: rule_id.into(),
            triggered: true,
            because: None,
            severity,
            obligation: Some(psys_policy::Obligation {
                missing_all_of: vec!["evi.b".into()],
                ..Default::default()
            }),
            evidence_violation: None,
            waived: false,
            waiver_scars: None,
            waiver_expired: false,
        }
    }

    #[test]
    fn empty_buffer_is_expected_failure_but_passed() {
        let c = case("neg.1", &["r.a"], &[]);
        let buffer = CaseBuffer::new();
        let violations = check_case(&c, &buffer, false);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ErrorCode::NegativeExampleExpectedFailureButPassed);
    }

    #[test]
    fn matching_expected_error_produces_no_violation() {
        let c = case("neg.1", &["r.a"], &[]);
        let mut buffer = CaseBuffer::new();
        buffer.record_rule_evaluation(&rule_eval("r.a", Severity::Error));
        assert!(check_case(&c, &buffer, true).is_empty());
    }

    #[test]
    fn missing_expected_error_is_rule_not_found() {
        let c = case("neg.1", &["r.a", "r.b"], &[]);
        let mut buffer = CaseBuffer::new();
        buffer.record_rule_evaluation(&rule_eval("r.a", Severity::Error));
        let violations = check_case(&c, &buffer, false);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ErrorCode::NegativeExampleRuleNotFound);
    }

    #[test]
    fn unexpected_fired_id_is_rejected_only_in_strict_mode() {
        let c = case("neg.1", &["r.a"], &[]);
        let mut buffer = CaseBuffer::new();
        buffer.record_rule_evaluation(&rule_eval("r.a", Severity::Error));
        buffer.record_rule_evaluation(&rule_eval("r.extra", Severity::Error));

        assert!(check_case(&c, &buffer, false).is_empty());

        let strict_violations = check_case(&c, &buffer, true);
        assert_eq!(strict_violations.len(), 1);
        assert_eq!(strict_violations[0].code, ErrorCode::NegativeExampleUnexpectedRuleFired);
    }

    #[test]
    fn structural_violation_is_matched_by_error_code_string() {
        let c = case("neg.1", &["DOMAIN_IMMISCIBLE"], &[]);
        let mut buffer = CaseBuffer::new();
        buffer.record_violation(&Violation::new(
            ErrorCode::DomainImmiscible,
            "immiscible",
            Severity::Error,
        ));
        assert!(check_case(&c, &buffer, true).is_empty());
    }

    #[test]
    fn waived_rule_does_not_count_as_fired() {
        let c = case("neg.1", &[], &[]);
        let mut buffer = CaseBuffer::new();
        let mut eval = rule_eval("r.a", Severity::Error);
        eval.waived = true;
        buffer.record_rule_evaluation(&eval);
        let violations = check_case(&c, &buffer, true);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ErrorCode::NegativeExampleExpectedFailureButPassed);
    }
}
