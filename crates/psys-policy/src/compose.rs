// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pack composition: which bond rules apply to a given compound.

use psys_core::{BondPack, BondRule, Compound, DomainRegistry, Profile, Table};
use psys_error::{ErrorCode, Severity, Violation};
use psys_index::ElementIndex;
use std::collections::{BTreeMap, BTreeSet};

/// Identifier of the always-special membrane pack.
pub const MEMBRANE_PACK_ID: &str = "membrane";

/// Compiled view over the base ruleset, every declared pack, and each pack's own rules, ready to
/// answer `rules_for(compound)`.
#[derive(Debug, Clone)]
pub struct PackComposer<'a> {
    base_rules: &'a [BondRule],
    packs: &'a [BondPack],
    pack_rules: &'a BTreeMap<String, Vec<BondRule>>,
    domains: &'a DomainRegistry,
}

impl<'a> PackComposer<'a> {
    /// Build a composer over the loaded base rules, pack metadata, and each pack's own rule file.
    #[must_use]
    pub fn new(
        base_rules: &'a [BondRule],
        packs: &'a [BondPack],
        pack_rules: &'a BTreeMap<String, Vec<BondRule>>,
        domains: &'a DomainRegistry,
    ) -> Self {
        Self {
            base_rules,
            packs,
            pack_rules,
            domains,
        }
    }

    /// Validates pack metadata in isolation, independent of any profile or compound: every pack's
    /// declared domains must resolve in the registry, and rule ids must be globally unique across
    /// base rules and every pack's rules (not just the enabled subset — a disabled pack colliding
    /// with another pack's id is still a latent authoring error).
    pub fn validate_packs(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut seen_pack_ids = BTreeSet::new();
        for pack in self.packs {
            if !seen_pack_ids.insert(pack.id.clone()) {
                violations.push(
                    Violation::new(
                        ErrorCode::IdDuplicate,
                        format!("pack id {:?} is declared more than once", pack.id),
                        Severity::Error,
                    )
                    .with_context("id", &pack.id),
                );
            }
            for domain_id in &pack.domains {
                if self.domains.get(domain_id).is_none() && !self.domains.is_neutral(domain_id) {
                    violations.push(
                        Violation::new(
                            ErrorCode::ReferenceUnknownDomain,
                            format!(
                                "pack {:?} declares unknown domain {:?}",
                                pack.id, domain_id
                            ),
                            Severity::Error,
                        )
                        .with_context("pack_id", &pack.id)
                        .with_context("domain_id", domain_id),
                    );
                }
            }
        }

        let mut seen_rule_ids: BTreeMap<&str, &str> = BTreeMap::new();
        for rule in self.base_rules {
            Self::record_rule_id(rule.id.as_str(), "base", &mut seen_rule_ids, &mut violations);
        }
        for (pack_id, rules) in self.pack_rules {
            for rule in rules {
                Self::record_rule_id(rule.id.as_str(), pack_id.as_str(), &mut seen_rule_ids, &mut violations);
            }
        }
        violations
    }

    fn record_rule_id<'b>(
        rule_id: &'b str,
        owner: &'b str,
        seen: &mut BTreeMap<&'b str, &'b str>,
        violations: &mut Vec<Violation>,
    ) {
        if let Some(first_owner) = seen.insert(rule_id, owner) {
            violations.push(
                Violation::new(
                    ErrorCode::IdDuplicate,
                    format!(
                        "rule id {rule_id:?} is declared in both {first_owner:?} and {owner:?}"
                    ),
                    Severity::Error,
                )
                .with_context("id", rule_id),
            );
        }
    }

    /// The effective set of enabled pack ids for `profile`: an explicit `enabled_packs[]`
    /// replaces the default-enabled set entirely; an empty `enabled_packs[]` falls back to every
    /// pack with `default_enabled = true`. Returns a violation for each entry of
    /// `profile.enabled_packs` that does not name a known pack.
    pub fn enabled_pack_ids(&self, profile: &Profile) -> (BTreeSet<String>, Vec<Violation>) {
        let mut violations = Vec::new();
        if profile.enabled_packs.is_empty() {
            let defaults = self
                .packs
                .iter()
                .filter(|p| p.default_enabled)
                .map(|p| p.id.clone())
                .collect();
            return (defaults, violations);
        }
        let known: BTreeSet<&str> = self.packs.iter().map(|p| p.id.as_str()).collect();
        let mut enabled = BTreeSet::new();
        for id in &profile.enabled_packs {
            if known.contains(id.as_str()) {
                enabled.insert(id.clone());
            } else {
                violations.push(
                    Violation::new(
                        ErrorCode::ProfileUnknownPack,
                        format!("profile {:?} enables unknown pack {:?}", profile.name, id),
                        Severity::Error,
                    )
                    .with_context("profile", &profile.name)
                    .with_context("pack_id", id),
                );
            }
        }
        (enabled, violations)
    }

    /// The union of `element.domain` for every element in `compound`, restricted to non-neutral
    /// domains, plus whether any member element belongs to a neutral domain.
    #[must_use]
    pub fn inferred_domains(&self, compound: &Compound, index: &ElementIndex) -> (BTreeSet<String>, bool) {
        let mut non_neutral = BTreeSet::new();
        let mut uses_neutral = false;
        for element_id in &compound.elements {
            let Some(element) = index.get(element_id) else {
                continue;
            };
            let Some(domain) = &element.domain else {
                continue;
            };
            if self.domains.is_neutral(domain) {
                uses_neutral = true;
            } else {
                non_neutral.insert(domain.clone());
            }
        }
        (non_neutral, uses_neutral)
    }

    /// The rules applicable to `compound` under `profile`: base rules always apply; the
    /// `membrane` pack applies when enabled and the compound touches a neutral domain; every
    /// other enabled pack applies when its declared domains intersect the compound's inferred
    /// non-neutral domains.
    pub fn rules_for(
        &self,
        compound: &Compound,
        profile: &Profile,
        index: &ElementIndex,
    ) -> (Vec<&'a BondRule>, Vec<Violation>) {
        let (enabled, mut violations) = self.enabled_pack_ids(profile);
        let (non_neutral_domains, uses_neutral) = self.inferred_domains(compound, index);

        let mut rules: Vec<&BondRule> = self.base_rules.iter().collect();
        for pack in self.packs {
            if !enabled.contains(&pack.id) {
                continue;
            }
            let applies = if pack.id == MEMBRANE_PACK_ID {
                uses_neutral
            } else {
                pack.domains.iter().any(|d| non_neutral_domains.contains(d))
            };
            if !applies {
                continue;
            }
            if let Some(pack_rules) = self.pack_rules.get(&pack.id) {
                rules.extend(pack_rules.iter());
            }
        }

        let mut seen = BTreeSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                violations.push(
                    Violation::new(
                        ErrorCode::IdDuplicate,
                        format!("rule id {:?} applies more than once to compound {:?}", rule.id, compound.id),
                        Severity::Error,
                    )
                    .with_context("id", &rule.id)
                    .with_context("compound_id", &compound.id),
                );
            }
        }

        (rules, violations)
    }

    /// Whether `table` ranks ahead of another under `safety_first` tie-breaking. Exposed for the
    /// obligation engine's remediation tie-break.
    #[must_use]
    pub fn table_rank(table: Table) -> u8 {
        table.safety_first_rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psys_core::{Domain, DomainRegistry, Element, EvidenceBindingMode, WhenClause, RequireClause, RuleSeverity};
    use std::collections::BTreeSet as StdBTreeSet;

    fn domain(id: &str) -> Domain {
        Domain {
            id: id.to_string(),
            name: id.to_string(),
            summary: String::new(),
            reason_for_existence: String::new(),
            unique_invariants: Vec::new(),
            collapse_risk: String::new(),
            compose_tiebreak_strategy: None,
            remediation_any_of_strategy: None,
            extensions: BTreeMap::new(),
        }
    }

    fn registry() -> DomainRegistry {
        DomainRegistry {
            domains: vec![domain("internet_app"), domain("embedded_realtime")],
            neutral_domain: Some("membrane".to_string()),
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    fn elem(id: &str, domain: Option<&str>) -> Element {
        Element {
            id: id.to_string(),
            table: Table::Experience,
            group: "g".into(),
            name: "n".into(),
            summary: "s".into(),
            domain: domain.map(str::to_string),
            tags: StdBTreeSet::new(),
            required_states: Vec::new(),
            implies: Vec::new(),
            requires: Vec::new(),
            invariants: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    fn rule(id: &str) -> BondRule {
        BondRule {
            id: id.to_string(),
            when: WhenClause {
                any_of: Some(vec!["exp.a".to_string()]),
                all_of: None,
                any_tag: None,
                table_any_of: None,
            },
            require: RequireClause {
                all_of: Some(vec!["evi.b".to_string()]),
                any_of: None,
                state_requirements: None,
                states: None,
                invariants: None,
            },
            message: "m".into(),
            severity: RuleSeverity::Error,
            extensions: BTreeMap::new(),
        }
    }

    fn compound(elements: Vec<&str>) -> Compound {
        Compound {
            id: "comp.x".into(),
            name: "x".into(),
            tables_version: "v1".into(),
            elements: elements.into_iter().map(str::to_string).collect(),
            domain: None,
            invariants: Vec::new(),
            director_notes: None,
            waivers: Vec::new(),
            evidence_binding_mode: EvidenceBindingMode::ImplicitById,
            evidence_bindings: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn membrane_pack_applies_only_when_compound_touches_neutral_domain() {
        let (index, _) = ElementIndex::build(vec![elem("exp.a", Some("membrane"))]);
        let base = vec![rule("r.base")];
        let packs = vec![BondPack {
            id: "membrane".into(),
            path: "membrane.json".into(),
            domains: vec!["membrane".into()],
            default_enabled: true,
            description: String::new(),
            extensions: BTreeMap::new(),
        }];
        let pack_rules = BTreeMap::from([("membrane".to_string(), vec![rule("r.membrane")])]);
        let registry = registry();
        let composer = PackComposer::new(&base, &packs, &pack_rules, &registry);
        let profile = Profile {
            name: "ship".into(),
            severity_overrides: BTreeMap::new(),
            enabled_packs: Vec::new(),
            extensions: BTreeMap::new(),
        };
        let (rules, violations) = composer.rules_for(&compound(vec!["exp.a"]), &profile, &index);
        assert!(violations.is_empty());
        assert!(rules.iter().any(|r| r.id == "r.membrane"));
    }

    #[test]
    fn non_membrane_pack_requires_domain_intersection() {
        let (index, _) = ElementIndex::build(vec![elem("exp.a", Some("internet_app"))]);
        let base = vec![];
        let packs = vec![BondPack {
            id: "internet_app".into(),
            path: "internet_app.json".into(),
            domains: vec!["internet_app".into()],
            default_enabled: false,
            description: String::new(),
            extensions: BTreeMap::new(),
        }];
        let pack_rules = BTreeMap::from([("internet_app".to_string(), vec![rule("r.net")])]);
        let registry = registry();
        let composer = PackComposer::new(&base, &packs, &pack_rules, &registry);
        let profile = Profile {
            name: "ship".into(),
            severity_overrides: BTreeMap::new(),
            enabled_packs: vec!["internet_app".into()],
            extensions: BTreeMap::new(),
        };
        let (rules, _) = composer.rules_for(&compound(vec!["exp.a"]), &profile, &index);
        assert!(rules.iter().any(|r| r.id == "r.net"));
    }

    #[test]
    fn enabling_unknown_pack_is_an_error() {
        let base = vec![];
        let packs = vec![];
        let pack_rules = BTreeMap::new();
        let registry = registry();
        let composer = PackComposer::new(&base, &packs, &pack_rules, &registry);
        let profile = Profile {
            name: "ship".into(),
            severity_overrides: BTreeMap::new(),
            enabled_packs: vec!["nonexistent".into()],
            extensions: BTreeMap::new(),
        };
        let (_, violations) = composer.enabled_pack_ids(&profile);
        assert!(violations.iter().any(|v| v.code == ErrorCode::ProfileUnknownPack));
    }

    #[test]
    fn validate_packs_rejects_unknown_domain_and_duplicate_rule_ids() {
        let base = vec![rule("r.shared")];
        let packs = vec![BondPack {
            id: "ghost".into(),
            path: "ghost.json".into(),
            domains: vec!["does_not_exist".into()],
            default_enabled: false,
            description: String::new(),
            extensions: BTreeMap::new(),
        }];
        let pack_rules = BTreeMap::from([("ghost".to_string(), vec![rule("r.shared")])]);
        let registry = registry();
        let composer = PackComposer::new(&base, &packs, &pack_rules, &registry);
        let violations = composer.validate_packs();
        assert!(violations.iter().any(|v| v.code == ErrorCode::ReferenceUnknownDomain));
        assert!(violations.iter().any(|v| v.code == ErrorCode::IdDuplicate));
    }
}
