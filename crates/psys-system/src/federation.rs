// SPDX-License-Identifier: MIT OR Apache-2.0
//! Domain federation: declared-vs-inferred domain checks, immiscibility, domain→pack
//! enforcement, and flow↔workshop pairing for a single compound.

use psys_core::{Compound, DomainRegistry, Profile};
use psys_error::{ErrorCode, Severity, Violation};
use psys_index::ElementIndex;
use psys_loader::documents::FlowWorkshopPairs;
use psys_policy::{PackComposer, MEMBRANE_PACK_ID};
use std::collections::BTreeSet;

/// Union of a compound's non-neutral element domains, plus whether it also touches a neutral one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainInference {
    /// Non-neutral domains touched by at least one member element.
    pub non_neutral: BTreeSet<String>,
    /// Whether any member element belongs to a neutral domain.
    pub uses_neutral: bool,
}

impl DomainInference {
    /// `true` when more than one non-neutral domain is present: a declared `domain` is then
    /// forbidden and the compound must be split or left domain-less.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.non_neutral.len() > 1
    }

    /// The single unambiguous inferred domain, if exactly one non-neutral domain is present.
    #[must_use]
    pub fn single(&self) -> Option<&str> {
        if self.non_neutral.len() == 1 {
            self.non_neutral.iter().next().map(String::as_str)
        } else {
            None
        }
    }
}

/// Infers `compound`'s domain footprint via the same element-domain union the pack composer
/// uses to decide which packs apply.
#[must_use]
pub fn infer(composer: &PackComposer<'_>, compound: &Compound, index: &ElementIndex) -> DomainInference {
    let (non_neutral, uses_neutral) = composer.inferred_domains(compound, index);
    DomainInference { non_neutral, uses_neutral }
}

/// Checks `compound.domain` (if declared) against the inferred footprint (§4.7 declared vs
/// inferred).
pub fn validate_declared_domain(compound: &Compound, inference: &DomainInference) -> Vec<Violation> {
    let Some(declared) = &compound.domain else {
        return Vec::new();
    };
    if inference.is_ambiguous() {
        return vec![Violation::new(
            ErrorCode::DomainDeclaredAmbiguous,
            format!(
                "compound {:?} declares domain {:?} but its elements span more than one domain; \
                 omit domain or split the compound",
                compound.id, declared
            ),
            Severity::Error,
        )
        .with_context("compound_id", &compound.id)
        .with_context("declared", declared)
        .with_context("inferred", &inference.non_neutral)];
    }
    match inference.single() {
        Some(inferred) if inferred == declared => Vec::new(),
        _ => vec![Violation::new(
            ErrorCode::DomainDeclaredMismatch,
            format!(
                "compound {:?} declares domain {:?} which disagrees with its inferred domain",
                compound.id, declared
            ),
            Severity::Error,
        )
        .with_context("compound_id", &compound.id)
        .with_context("declared", declared)
        .with_context("inferred", inference.single())],
    }
}

/// Checks that no two non-neutral domains present in `compound` are listed as immiscible.
pub fn validate_immiscibility(
    compound_id: &str,
    inference: &DomainInference,
    registry: &DomainRegistry,
) -> Vec<Violation> {
    let domains: Vec<&String> = inference.non_neutral.iter().collect();
    let mut violations = Vec::new();
    for i in 0..domains.len() {
        for j in (i + 1)..domains.len() {
            if registry.are_immiscible(domains[i], domains[j]) {
                let mut pair = [domains[i].as_str(), domains[j].as_str()];
                pair.sort_unstable();
                violations.push(
                    Violation::new(
                        ErrorCode::DomainImmiscible,
                        format!(
                            "compound {compound_id:?} mixes immiscible domains {:?} and {:?}",
                            pair[0], pair[1]
                        ),
                        Severity::Error,
                    )
                    .with_context("compound_id", compound_id)
                    .with_context("domains", pair),
                );
            }
        }
    }
    violations
}

/// Checks that every non-neutral domain `compound` touches has a pack of the same id that both
/// exists and is enabled under `profile`, and that the membrane pack is enabled whenever a
/// neutral-domain element is used (§4.7 domain → pack enforcement).
pub fn validate_pack_enforcement(
    compound_id: &str,
    inference: &DomainInference,
    composer: &PackComposer<'_>,
    profile: &Profile,
    pack_ids: &BTreeSet<String>,
) -> Vec<Violation> {
    let (enabled, mut violations) = composer.enabled_pack_ids(profile);

    for domain_id in &inference.non_neutral {
        if !pack_ids.contains(domain_id) {
            violations.push(
                Violation::new(
                    ErrorCode::PacksMissingForDomain,
                    format!(
                        "compound {compound_id:?} uses domain {domain_id:?} but no pack with that \
                         id is declared"
                    ),
                    Severity::Error,
                )
                .with_context("compound_id", compound_id)
                .with_context("domain_id", domain_id)
                .with_context("remediation", "create_pack_stub"),
            );
        } else if !enabled.contains(domain_id) {
            violations.push(
                Violation::new(
                    ErrorCode::ProfilePackMissingForDomain,
                    format!(
                        "compound {compound_id:?} uses domain {domain_id:?} but pack {domain_id:?} \
                         is not enabled under profile {:?}",
                        profile.name
                    ),
                    Severity::Error,
                )
                .with_context("compound_id", compound_id)
                .with_context("domain_id", domain_id)
                .with_context("profile", &profile.name)
                .with_context("remediation", "enable_pack"),
            );
        }
    }

    if inference.uses_neutral && !enabled.contains(MEMBRANE_PACK_ID) {
        violations.push(
            Violation::new(
                ErrorCode::ProfilePackMissingForDomain,
                format!(
                    "compound {compound_id:?} uses a neutral-domain element but the membrane pack \
                     is not enabled under profile {:?}",
                    profile.name
                ),
                Severity::Error,
            )
            .with_context("compound_id", compound_id)
            .with_context("domain_id", MEMBRANE_PACK_ID)
            .with_context("profile", &profile.name)
            .with_context("remediation", "enable_pack"),
        );
    }

    violations
}

/// Checks flow↔workshop pairing: every `pairs[]` entry whose `flow` element is present in
/// `compound` must also have its `workshop` element present (§4.7).
pub fn validate_flow_workshop_pairing(compound: &Compound, pairs: &FlowWorkshopPairs) -> Vec<Violation> {
    let present: BTreeSet<&str> = compound.elements.iter().map(String::as_str).collect();
    let mut violations = Vec::new();
    for pair in &pairs.pairs {
        if present.contains(pair.flow.as_str()) && !present.contains(pair.workshop.as_str()) {
            violations.push(
                Violation::new(ErrorCode::PairFlowWorkshopMissing, pair.message.clone(), pair.severity.into())
                    .with_context("compound_id", &compound.id)
                    .with_context("flow", &pair.flow)
                    .with_context("workshop", &pair.workshop)
                    .with_context("remediation", format!("add_element:{}", pair.workshop)),
            );
        }
    }
    violations
}
