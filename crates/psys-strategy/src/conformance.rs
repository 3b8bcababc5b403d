// SPDX-License-Identifier: MIT OR Apache-2.0
//! Strategy registry conformance (§4.18): canonical-semantics hash verification and
//! counterexample fixture replay for every loaded registry entry.

use psys_error::{ErrorCode, PsysError, Severity, Violation};
use psys_loader::{StrategyEntry, StrategyFixture, StrategyRegistry};

use crate::combining::{order_links, Algorithm, Decision, Link};

/// Checks every entry in `registry`: a recognized `combining.algorithm`, a
/// `canonical_semantics_hash_sha256` matching the recomputed hash, and every attached fixture
/// replaying to its expected decision.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error (hashing the semantics tuple).
pub fn check(registry: &StrategyRegistry) -> Result<Vec<Violation>, PsysError> {
    let mut violations = Vec::new();
    for entry in &registry.strategies {
        check_entry(entry, &mut violations)?;
    }
    Ok(violations)
}

fn check_entry(entry: &StrategyEntry, violations: &mut Vec<Violation>) -> Result<(), PsysError> {
    let Some(algorithm) = Algorithm::parse(&entry.combining.algorithm) else {
        violations.push(
            Violation::new(
                ErrorCode::StrategyRegistryBadAlgorithm,
                format!("strategy {:?} declares unknown algorithm {:?}", entry.strategy_id, entry.combining.algorithm),
                Severity::Error,
            )
            .with_context("strategy_id", &entry.strategy_id),
        );
        return Ok(());
    };

    let expected_hash = canonical_semantics_hash(entry)?;
    if entry.canonical_semantics_hash_sha256 != expected_hash {
        violations.push(
            Violation::new(
                ErrorCode::StrategyRegistryHashMismatch,
                format!("strategy {:?} canonical_semantics_hash_sha256 does not match its recomputed hash", entry.strategy_id),
                Severity::Error,
            )
            .with_context("strategy_id", &entry.strategy_id)
            .with_context("expected", &expected_hash)
            .with_context("declared", &entry.canonical_semantics_hash_sha256),
        );
    }

    for fixture in &entry.fixtures {
        check_fixture(entry, algorithm, fixture, violations);
    }
    Ok(())
}

/// `sha256_hex(stable_stringify({strategy_id, kind, name, combining:{algorithm}}) + "\n")`.
fn canonical_semantics_hash(entry: &StrategyEntry) -> Result<String, PsysError> {
    let tuple = serde_json::json!({
        "strategy_id": entry.strategy_id,
        "kind": entry.kind,
        "name": entry.name,
        "combining": { "algorithm": entry.combining.algorithm },
    });
    psys_core::hash_artifact(&tuple)
}

fn check_fixture(entry: &StrategyEntry, algorithm: Algorithm, fixture: &StrategyFixture, violations: &mut Vec<Violation>) {
    let Some(expected) = Decision::parse(&fixture.expected) else {
        violations.push(fixture_mismatch(entry, fixture, &format!("unrecognized expected decision {:?}", fixture.expected)));
        return;
    };

    let mut links = Vec::with_capacity(fixture.links.len());
    for raw in &fixture.links {
        let Some(decision) = Decision::parse(&raw.decision) else {
            violations.push(fixture_mismatch(
                entry,
                fixture,
                &format!("link {:?} has unrecognized decision {:?}", raw.id, raw.decision),
            ));
            return;
        };
        links.push(Link { id: raw.id.clone(), decision });
    }
    order_links(&mut links);

    match algorithm.resolve(&links) {
        Ok(actual) if actual == expected => {}
        Ok(actual) => {
            violations.push(fixture_mismatch(
                entry,
                fixture,
                &format!("resolved {actual:?}, expected {expected:?}"),
            ));
        }
        Err(n) => {
            violations.push(fixture_mismatch(
                entry,
                fixture,
                &format!("{n} links resolved non-abstain under only_one_applicable"),
            ));
        }
    }
}

fn fixture_mismatch(entry: &StrategyEntry, fixture: &StrategyFixture, detail: &str) -> Violation {
    Violation::new(
        ErrorCode::StrategyRegistryFixtureMismatch,
        format!("strategy {:?} fixture family {:?}: {detail}", entry.strategy_id, fixture.family),
        Severity::Error,
    )
    .with_context("strategy_id", &entry.strategy_id)
    .with_context("family", &fixture.family)
}

#[cfg(test)]
mod tests {
    use super::*;
    use psys_loader::{Combining, LinkEffect};
    use std::collections::BTreeMap;

    fn entry(algorithm: &str, fixtures: Vec<StrategyFixture>) -> StrategyEntry {
        let mut e = StrategyEntry {
            strategy_id: "strategy.deny_wins".into(),
            kind: "combining".into(),
            name: "Deny wins".into(),
            combining: Combining { algorithm: algorithm.into() },
            canonical_semantics_hash_sha256: String::new(),
            fixtures,
            extensions: BTreeMap::new(),
        };
        e.canonical_semantics_hash_sha256 = canonical_semantics_hash(&e).unwrap();
        e
    }

    fn fixture(family: &str, links: Vec<(&str, &str)>, expected: &str) -> StrategyFixture {
        StrategyFixture {
            family: family.into(),
            links: links.into_iter().map(|(id, decision)| LinkEffect { id: id.into(), decision: decision.into() }).collect(),
            expected: expected.into(),
        }
    }

    #[test]
    fn correct_hash_and_passing_fixture_produce_no_violation() {
        let e = entry("deny_overrides", vec![fixture("f.a", vec![("l.a", "permit"), ("l.b", "deny")], "deny")]);
        let registry = StrategyRegistry { schema: "periodic.strategy_registry.v1".into(), strategies: vec![e], extensions: BTreeMap::new() };
        assert!(check(&registry).unwrap().is_empty());
    }

    #[test]
    fn tampered_hash_is_reported() {
        let mut e = entry("deny_overrides", vec![]);
        e.canonical_semantics_hash_sha256 = "0".repeat(64);
        let registry = StrategyRegistry { schema: "periodic.strategy_registry.v1".into(), strategies: vec![e], extensions: BTreeMap::new() };
        let violations = check(&registry).unwrap();
        assert!(violations.iter().any(|v| v.code == ErrorCode::StrategyRegistryHashMismatch));
    }

    #[test]
    fn unknown_algorithm_is_reported_and_skips_further_checks() {
        let e = entry("highest_priority_wins", vec![]);
        let registry = StrategyRegistry { schema: "periodic.strategy_registry.v1".into(), strategies: vec![e], extensions: BTreeMap::new() };
        let violations = check(&registry).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ErrorCode::StrategyRegistryBadAlgorithm);
    }

    #[test]
    fn fixture_mismatch_is_reported() {
        let e = entry("deny_overrides", vec![fixture("f.a", vec![("l.a", "permit")], "deny")]);
        let registry = StrategyRegistry { schema: "periodic.strategy_registry.v1".into(), strategies: vec![e], extensions: BTreeMap::new() };
        let violations = check(&registry).unwrap();
        assert!(violations.iter().any(|v| v.code == ErrorCode::StrategyRegistryFixtureMismatch));
    }

    #[test]
    fn only_one_applicable_fixture_mismatch_on_two_non_abstaining_links() {
        let e = entry("only_one_applicable", vec![fixture("f.b", vec![("l.a", "permit"), ("l.b", "deny")], "deny")]);
        let registry = StrategyRegistry { schema: "periodic.strategy_registry.v1".into(), strategies: vec![e], extensions: BTreeMap::new() };
        let violations = check(&registry).unwrap();
        assert!(violations.iter().any(|v| v.code == ErrorCode::StrategyRegistryFixtureMismatch));
    }
}
