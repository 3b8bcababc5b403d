// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-policy
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Pack composition, predicate/obligation evaluation, evidence binding, severity resolution, and
//! waiver resolution for a single compound: the rule-evaluation core of the provenance evaluator.
//! Domain federation (declared-vs-inferred domain checks, immiscibility, domain→pack enforcement)
//! and cross-compound system evaluation live in `psys-system`, one layer up, which composes the
//! primitives here per compound before reasoning about links between them.

/// Which bond rules apply to a compound, given its enabled packs (§4.4).
pub mod compose;
/// Ties predicate matching, obligation checking, evidence binding, severity, and waivers
/// together into one per-rule outcome.
pub mod evaluate;
/// Evidence-binding check for `explicit_only` compounds (§4.6.1).
pub mod evidence;
/// Obligation checking and remediation planning (§4.6).
pub mod obligation;
/// `when{}` predicate matching (§4.5).
pub mod predicate;
/// Profile-override severity resolution (§4.6.2).
pub mod severity;
/// Waiver suppression and expiry (§4.6.3).
pub mod waiver;

pub use compose::{PackComposer, MEMBRANE_PACK_ID};
pub use evaluate::{evaluate_rule, RuleEvaluation};
pub use evidence::EvidenceBindingViolation;
pub use obligation::{evaluate as evaluate_obligation, Obligation, Remediation, TX_STATUS_ELEMENT_ID};
pub use predicate::{triggered, BecauseTrace, TriggerResult};
pub use waiver::{WaiverResolution, WaiverScars, COMPOUND_TARGET};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use psys_core::{
        BondRule, Compound, EvidenceBindingMode, RequireClause, RuleSeverity, Table, WhenClause,
    };
    use psys_index::ElementIndex;
    use std::collections::BTreeMap;

    #[test]
    fn public_api_covers_the_scenario_2_fixture() {
        let element_a = psys_core::Element {
            id: "exp.a".into(),
            table: Table::Experience,
            group: "g".into(),
            name: "a".into(),
            summary: "s".into(),
            domain: None,
            tags: Default::default(),
            required_states: Vec::new(),
            implies: Vec::new(),
            requires: Vec::new(),
            invariants: Vec::new(),
            extensions: BTreeMap::new(),
        };
        let (index, _) = ElementIndex::build(vec![element_a]);
        let rule = BondRule {
            id: "r.require_b".into(),
            when: WhenClause {
                any_of: Some(vec!["exp.a".into()]),
                ..Default::default()
            },
            require: RequireClause {
                all_of: Some(vec!["evi.b".into()]),
                ..Default::default()
            },
            message: "requires evi.b when exp.a present".into(),
            severity: RuleSeverity::Error,
            extensions: BTreeMap::new(),
        };
        let compound = Compound {
            id: "comp.x".into(),
            name: "x".into(),
            tables_version: "v1".into(),
            elements: vec!["exp.a".into()],
            domain: None,
            invariants: Vec::new(),
            director_notes: None,
            waivers: Vec::new(),
            evidence_binding_mode: EvidenceBindingMode::ImplicitById,
            evidence_bindings: BTreeMap::new(),
            extensions: BTreeMap::new(),
        };
        let profile = psys_core::Profile {
            name: "ship".into(),
            severity_overrides: BTreeMap::new(),
            enabled_packs: Vec::new(),
            extensions: BTreeMap::new(),
        };
        let as_of: NaiveDate = "2024-05-01".parse().unwrap();
        let outcome = evaluate_rule(&rule, &compound, &index, &profile, None, &[], as_of);
        let obligation = outcome.obligation.expect("obligation should be unmet");
        assert_eq!(obligation.missing_all_of, vec!["evi.b"]);
        assert_eq!(obligation.remediation.add_elements, vec!["evi.b"]);
        assert_eq!(obligation.remediation.add_evidence_ids, vec!["evi.b"]);
        assert_eq!(obligation.remediation.tie_break, None);
        assert!(outcome.counts_as_violation());
    }
}
