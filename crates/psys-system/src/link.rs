// SPDX-License-Identifier: MIT OR Apache-2.0
//! System graph evaluation: alias resolution, membrane-crossing checks, endorsement-group
//! validation, and system-scoped waiver target checks (§4.8).
//!
//! Grounded on the donor's [`abp-receipt::chain`] pattern of validating an ordered collection
//! with typed, index-carrying errors before accepting it — generalized here from "one chain,
//! validated end to end" into "one link group, validated by `(from, to, cap)`".

use psys_core::{Compound, DomainRegistry, SpelMode, SpelSemantics, System, Waiver};
use psys_error::{ErrorCode, Severity, Violation};
use psys_index::ElementIndex;
use std::collections::BTreeMap;

/// Adds `system_id`/`alias` context to violations produced by evaluating one member compound in
/// isolation, so they read as system-scoped in the final report (§4.8 step 1).
#[must_use]
pub fn tag_member_violations(system_id: &str, alias: &str, violations: Vec<Violation>) -> Vec<Violation> {
    violations
        .into_iter()
        .map(|v| v.with_context("system_id", system_id).with_context("alias", alias))
        .collect()
}

fn endpoints<'a>(
    link: &'a psys_core::SystemLink,
    alias_to_compound: &'a BTreeMap<String, &'a Compound>,
) -> Option<(&'a Compound, &'a Compound)> {
    let from = alias_to_compound.get(&link.from)?;
    let to = alias_to_compound.get(&link.to)?;
    Some((*from, *to))
}

/// Validates every link in `system`: both endpoints must resolve, `via.cap` must be a
/// neutral-domain capability, and it must be present in both endpoints' element lists. Links
/// failing these checks are excluded from the endorsement-group validation that follows.
pub fn validate_links(
    system: &System,
    alias_to_compound: &BTreeMap<String, &Compound>,
    index: &ElementIndex,
    domains: &DomainRegistry,
    semantics: &SpelSemantics,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut valid_links: Vec<&psys_core::SystemLink> = Vec::new();

    for link in &system.links {
        let Some((from, to)) = endpoints(link, alias_to_compound) else {
            violations.push(
                Violation::new(
                    ErrorCode::SystemLinkMissingEndpoint,
                    format!(
                        "system {:?} link {} -> {} references an alias not in this system",
                        system.id, link.from, link.to
                    ),
                    Severity::Error,
                )
                .with_context("system_id", &system.id)
                .with_context("from", &link.from)
                .with_context("to", &link.to),
            );
            continue;
        };

        let cap = link.via.cap.as_str();
        let cap_is_membrane = index
            .get(cap)
            .and_then(|e| e.domain.as_deref())
            .is_some_and(|d| domains.is_neutral(d));
        if !cap_is_membrane {
            violations.push(
                Violation::new(
                    ErrorCode::SystemLinkNonMembraneCap,
                    format!(
                        "system {:?} link {} -> {} crosses via {cap:?}, which is not a neutral-domain \
                         capability",
                        system.id, link.from, link.to
                    ),
                    Severity::Error,
                )
                .with_context("system_id", &system.id)
                .with_context("from", &link.from)
                .with_context("to", &link.to)
                .with_context("cap", cap),
            );
        }

        let cap_present = from.elements.iter().any(|e| e == cap) && to.elements.iter().any(|e| e == cap);
        if !cap_present {
            violations.push(
                Violation::new(
                    ErrorCode::SystemLinkMissingCap,
                    format!(
                        "system {:?} link {} -> {} crosses via {cap:?}, which is missing from one \
                         or both endpoints' elements",
                        system.id, link.from, link.to
                    ),
                    Severity::Error,
                )
                .with_context("system_id", &system.id)
                .with_context("from", &link.from)
                .with_context("to", &link.to)
                .with_context("cap", cap),
            );
        }

        if cap_is_membrane && cap_present {
            valid_links.push(link);
        }
    }

    violations.extend(validate_endorsement_groups(system, &valid_links, semantics));
    violations
}

fn validate_endorsement_groups(
    system: &System,
    links: &[&psys_core::SystemLink],
    semantics: &SpelSemantics,
) -> Vec<Violation> {
    let mut groups: BTreeMap<(&str, &str, &str), Vec<&psys_core::SystemLink>> = BTreeMap::new();
    for link in links {
        groups
            .entry((link.from.as_str(), link.to.as_str(), link.via.cap.as_str()))
            .or_default()
            .push(link);
    }

    let mut violations = Vec::new();
    for ((from, to, cap), group) in groups {
        if group.len() <= 1 {
            continue;
        }
        match semantics.endorsement {
            SpelMode::MeaningPreserving => {
                violations.push(
                    Violation::new(
                        ErrorCode::SystemLinkAmbiguousEndorsement,
                        format!(
                            "system {:?} has {} links {from} -> {to} via {cap:?}, which is \
                             ambiguous under meaning-preserving endorsement semantics",
                            system.id,
                            group.len()
                        ),
                        Severity::Error,
                    )
                    .with_context("system_id", &system.id)
                    .with_context("from", from)
                    .with_context("to", to)
                    .with_context("cap", cap),
                );
            }
            SpelMode::IdentityBearing => {
                let mut seen_ids: BTreeMap<&str, usize> = BTreeMap::new();
                for link in &group {
                    match link.via.endorsement_id.as_deref() {
                        None | Some("") => {
                            violations.push(
                                Violation::new(
                                    ErrorCode::SystemLinkEndorsementIdRequired,
                                    format!(
                                        "system {:?} link {from} -> {to} via {cap:?} needs a unique \
                                         endorsement_id: its group has {} links",
                                        system.id,
                                        group.len()
                                    ),
                                    Severity::Error,
                                )
                                .with_context("system_id", &system.id)
                                .with_context("from", from)
                                .with_context("to", to)
                                .with_context("cap", cap),
                            );
                        }
                        Some(id) => {
                            *seen_ids.entry(id).or_insert(0) += 1;
                        }
                    }
                }
                for (id, count) in seen_ids {
                    if count > 1 {
                        violations.push(
                            Violation::new(
                                ErrorCode::SystemLinkEndorsementIdDuplicate,
                                format!(
                                    "system {:?} link group {from} -> {to} via {cap:?} reuses \
                                     endorsement_id {id:?} across {count} links",
                                    system.id
                                ),
                                Severity::Error,
                            )
                            .with_context("system_id", &system.id)
                            .with_context("from", from)
                            .with_context("to", to)
                            .with_context("cap", cap)
                            .with_context("endorsement_id", id),
                        );
                    }
                }
            }
        }
    }
    violations
}

/// Parses a `"link:<from>-><to>"` waiver-target or mitigation reference.
fn parse_link_ref(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix("link:")?;
    rest.split_once("->")
}

fn link_exists(system: &System, from: &str, to: &str) -> bool {
    system.links.iter().any(|l| l.from == from && l.to == to)
}

/// Validates system-scoped waiver targets and mitigations (§4.8 step 4): a target must be
/// `"system"` or `"link:<from>-><to>"` naming a link that exists; mitigations must each be
/// `"compound:<alias>"` naming a known alias, or a `"link:<from>-><to>"` reference that resolves.
pub fn validate_waivers(system: &System, alias_to_compound: &BTreeMap<String, &Compound>) -> Vec<Violation> {
    let mut violations = Vec::new();
    for waiver in &system.waivers {
        if !is_valid_waiver_target(system, &waiver.target) {
            violations.push(invalid_target(system, waiver));
        }
        for mitigation in &waiver.mitigations {
            if !is_valid_mitigation(system, alias_to_compound, mitigation) {
                violations.push(invalid_mitigation(system, waiver, mitigation));
            }
        }
    }
    violations
}

fn is_valid_waiver_target(system: &System, target: &str) -> bool {
    if target == "system" {
        return true;
    }
    match parse_link_ref(target) {
        Some((from, to)) => link_exists(system, from, to),
        None => false,
    }
}

fn is_valid_mitigation(system: &System, alias_to_compound: &BTreeMap<String, &Compound>, mitigation: &str) -> bool {
    if let Some(alias) = mitigation.strip_prefix("compound:") {
        return alias_to_compound.contains_key(alias);
    }
    match parse_link_ref(mitigation) {
        Some((from, to)) => link_exists(system, from, to),
        None => false,
    }
}

fn invalid_target(system: &System, waiver: &Waiver) -> Violation {
    Violation::new(
        ErrorCode::SystemWaiverInvalidTarget,
        format!(
            "system {:?} waiver for rule {:?} targets {:?}, which is neither \"system\" nor an \
             existing link",
            system.id, waiver.rule_id, waiver.target
        ),
        Severity::Error,
    )
    .with_context("system_id", &system.id)
    .with_context("rule_id", &waiver.rule_id)
    .with_context("target", &waiver.target)
}

fn invalid_mitigation(system: &System, waiver: &Waiver, mitigation: &str) -> Violation {
    Violation::new(
        ErrorCode::SystemWaiverInvalidMitigation,
        format!(
            "system {:?} waiver for rule {:?} names mitigation {mitigation:?}, which resolves to \
             neither a known compound alias nor an existing link",
            system.id, waiver.rule_id
        ),
        Severity::Error,
    )
    .with_context("system_id", &system.id)
    .with_context("rule_id", &waiver.rule_id)
    .with_context("mitigation", mitigation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use psys_core::{Element, EvidenceBindingMode, LinkVia, SystemLink, Table};
    use std::collections::BTreeMap as StdBTreeMap;

    fn compound_fixture(id: &str, elements: Vec<&str>) -> Compound {
        Compound {
            id: id.to_string(),
            name: id.to_string(),
            tables_version: "v1".into(),
            elements: elements.into_iter().map(str::to_string).collect(),
            domain: None,
            invariants: Vec::new(),
            director_notes: None,
            waivers: Vec::new(),
            evidence_binding_mode: EvidenceBindingMode::ImplicitById,
            evidence_bindings: StdBTreeMap::new(),
            extensions: StdBTreeMap::new(),
        }
    }

    fn cap_element(id: &str, domain: Option<&str>) -> Element {
        Element {
            id: id.to_string(),
            table: Table::Capability,
            group: "g".into(),
            name: "n".into(),
            summary: "s".into(),
            domain: domain.map(str::to_string),
            tags: Default::default(),
            required_states: Vec::new(),
            implies: Vec::new(),
            requires: Vec::new(),
            invariants: Vec::new(),
            extensions: StdBTreeMap::new(),
        }
    }

    fn system_fixture(links: Vec<SystemLink>) -> System {
        System {
            id: "system.demo".into(),
            compounds: vec![
                psys_core::SystemCompoundRef { alias: "left".into(), path: "left.json".into() },
                psys_core::SystemCompoundRef { alias: "right".into(), path: "right.json".into() },
            ],
            links,
            waivers: Vec::new(),
            extensions: StdBTreeMap::new(),
        }
    }

    fn semantics(endorsement: SpelMode) -> SpelSemantics {
        SpelSemantics {
            endorsement,
            declassification: SpelMode::MeaningPreserving,
            control_flow: SpelMode::MeaningPreserving,
            termination: SpelMode::MeaningPreserving,
            timing: SpelMode::MeaningPreserving,
            extensions: StdBTreeMap::new(),
        }
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let system = system_fixture(vec![SystemLink {
            from: "left".into(),
            to: "ghost".into(),
            via: LinkVia { cap: "cap.bridge".into(), notes: None, endorsement_id: None },
        }]);
        let left = compound_fixture("comp.left", vec!["cap.bridge"]);
        let alias_map: BTreeMap<String, &Compound> = [("left".to_string(), &left)].into_iter().collect();
        let (index, _) = ElementIndex::build(vec![cap_element("cap.bridge", Some("membrane"))]);
        let domains = DomainRegistry {
            domains: Vec::new(),
            neutral_domain: Some("membrane".into()),
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: StdBTreeMap::new(),
        };
        let violations =
            validate_links(&system, &alias_map, &index, &domains, &semantics(SpelMode::MeaningPreserving));
        assert!(violations.iter().any(|v| v.code == ErrorCode::SystemLinkMissingEndpoint));
    }

    #[test]
    fn non_neutral_cap_is_rejected() {
        let system = system_fixture(vec![SystemLink {
            from: "left".into(),
            to: "right".into(),
            via: LinkVia { cap: "cap.internal".into(), notes: None, endorsement_id: None },
        }]);
        let left = compound_fixture("comp.left", vec!["cap.internal"]);
        let right = compound_fixture("comp.right", vec!["cap.internal"]);
        let alias_map: BTreeMap<String, &Compound> =
            [("left".to_string(), &left), ("right".to_string(), &right)].into_iter().collect();
        let (index, _) = ElementIndex::build(vec![cap_element("cap.internal", Some("internet_app"))]);
        let domains = DomainRegistry {
            domains: Vec::new(),
            neutral_domain: Some("membrane".into()),
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: StdBTreeMap::new(),
        };
        let violations =
            validate_links(&system, &alias_map, &index, &domains, &semantics(SpelMode::MeaningPreserving));
        assert!(violations.iter().any(|v| v.code == ErrorCode::SystemLinkNonMembraneCap));
    }

    #[test]
    fn duplicate_links_under_meaning_preserving_are_ambiguous() {
        let link = |id: Option<&str>| SystemLink {
            from: "left".into(),
            to: "right".into(),
            via: LinkVia { cap: "cap.bridge".into(), notes: None, endorsement_id: id.map(str::to_string) },
        };
        let system = system_fixture(vec![link(None), link(None)]);
        let left = compound_fixture("comp.left", vec!["cap.bridge"]);
        let right = compound_fixture("comp.right", vec!["cap.bridge"]);
        let alias_map: BTreeMap<String, &Compound> =
            [("left".to_string(), &left), ("right".to_string(), &right)].into_iter().collect();
        let (index, _) = ElementIndex::build(vec![cap_element("cap.bridge", Some("membrane"))]);
        let domains = DomainRegistry {
            domains: Vec::new(),
            neutral_domain: Some("membrane".into()),
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: StdBTreeMap::new(),
        };
        let violations =
            validate_links(&system, &alias_map, &index, &domains, &semantics(SpelMode::MeaningPreserving));
        assert!(violations.iter().any(|v| v.code == ErrorCode::SystemLinkAmbiguousEndorsement));
    }

    #[test]
    fn identity_bearing_requires_unique_endorsement_ids() {
        let link = |id: Option<&str>| SystemLink {
            from: "left".into(),
            to: "right".into(),
            via: LinkVia { cap: "cap.bridge".into(), notes: None, endorsement_id: id.map(str::to_string) },
        };
        let system = system_fixture(vec![link(None), link(Some("e1"))]);
        let left = compound_fixture("comp.left", vec!["cap.bridge"]);
        let right = compound_fixture("comp.right", vec!["cap.bridge"]);
        let alias_map: BTreeMap<String, &Compound> =
            [("left".to_string(), &left), ("right".to_string(), &right)].into_iter().collect();
        let (index, _) = ElementIndex::build(vec![cap_element("cap.bridge", Some("membrane"))]);
        let domains = DomainRegistry {
            domains: Vec::new(),
            neutral_domain: Some("membrane".into()),
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: StdBTreeMap::new(),
        };
        let violations =
            validate_links(&system, &alias_map, &index, &domains, &semantics(SpelMode::IdentityBearing));
        assert!(violations.iter().any(|v| v.code == ErrorCode::SystemLinkEndorsementIdRequired));
    }

    #[test]
    fn duplicate_endorsement_ids_are_rejected() {
        let link = |id: &str| SystemLink {
            from: "left".into(),
            to: "right".into(),
            via: LinkVia { cap: "cap.bridge".into(), notes: None, endorsement_id: Some(id.to_string()) },
        };
        let system = system_fixture(vec![link("e1"), link("e1")]);
        let left = compound_fixture("comp.left", vec!["cap.bridge"]);
        let right = compound_fixture("comp.right", vec!["cap.bridge"]);
        let alias_map: BTreeMap<String, &Compound> =
            [("left".to_string(), &left), ("right".to_string(), &right)].into_iter().collect();
        let (index, _) = ElementIndex::build(vec![cap_element("cap.bridge", Some("membrane"))]);
        let domains = DomainRegistry {
            domains: Vec::new(),
            neutral_domain: Some("membrane".into()),
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: StdBTreeMap::new(),
        };
        let violations =
            validate_links(&system, &alias_map, &index, &domains, &semantics(SpelMode::IdentityBearing));
        assert!(violations.iter().any(|v| v.code == ErrorCode::SystemLinkEndorsementIdDuplicate));
    }

    #[test]
    fn waiver_targeting_unknown_link_is_rejected() {
        let system = system_fixture(vec![SystemLink {
            from: "left".into(),
            to: "right".into(),
            via: LinkVia { cap: "cap.bridge".into(), notes: None, endorsement_id: None },
        }]);
        let left = compound_fixture("comp.left", vec!["cap.bridge"]);
        let right = compound_fixture("comp.right", vec!["cap.bridge"]);
        let alias_map: BTreeMap<String, &Compound> =
            [("left".to_string(), &left), ("right".to_string(), &right)].into_iter().collect();
        let system_with_waiver = System {
            waivers: vec![Waiver {
                rule_id: "r.x".into(),
                target: "link:left->ghost".into(),
                rationale: "r".into(),
                mitigations: vec!["compound:left".into()],
                expires_on: "2999-01-01".parse().unwrap(),
                x_missing: None,
                extensions: StdBTreeMap::new(),
            }],
            ..system
        };
        let violations = validate_waivers(&system_with_waiver, &alias_map);
        assert!(violations.iter().any(|v| v.code == ErrorCode::SystemWaiverInvalidTarget));
    }

    #[test]
    fn waiver_with_valid_target_and_mitigation_passes() {
        let system = system_fixture(vec![SystemLink {
            from: "left".into(),
            to: "right".into(),
            via: LinkVia { cap: "cap.bridge".into(), notes: None, endorsement_id: None },
        }]);
        let left = compound_fixture("comp.left", vec!["cap.bridge"]);
        let right = compound_fixture("comp.right", vec!["cap.bridge"]);
        let alias_map: BTreeMap<String, &Compound> =
            [("left".to_string(), &left), ("right".to_string(), &right)].into_iter().collect();
        let system_with_waiver = System {
            waivers: vec![Waiver {
                rule_id: "r.x".into(),
                target: "link:left->right".into(),
                rationale: "r".into(),
                mitigations: vec!["compound:left".into(), "link:left->right".into()],
                expires_on: "2999-01-01".parse().unwrap(),
                x_missing: None,
                extensions: StdBTreeMap::new(),
            }],
            ..system
        };
        assert!(validate_waivers(&system_with_waiver, &alias_map).is_empty());
    }
}
