// SPDX-License-Identifier: MIT OR Apache-2.0
//! Safety envelope (§4.14): a compact posture summary binding a profile's SPEL semantics and a
//! domain registry's tie-break overrides into the receipt.

use psys_core::{ComposeTiebreakStrategy, DomainRegistry, RemediationAnyOfStrategy, SpelMode, SpelSemantics};
use psys_error::PsysError;
use serde::Serialize;

const SCHEMA: &str = "periodic.safety_envelope.v1";

/// One domain's tie-break overrides, present only when it declares at least one.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DomainOverride {
    /// Domain id.
    pub domain_id: String,
    /// Compose tie-break strategy, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose_tiebreak_strategy: Option<ComposeTiebreakStrategy>,
    /// Remediation any-of strategy, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation_any_of_strategy: Option<RemediationAnyOfStrategy>,
}

/// Counts of domains/semantics carrying the safety-first or identity-bearing posture.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Domain ids whose `compose_tiebreak_strategy` is `safety_first_taint`.
    pub safety_first_taint_domains: Vec<String>,
    /// Domain ids whose `remediation_any_of_strategy` is `safety_first`.
    pub safety_first_remediation_domains: Vec<String>,
    /// SPEL semantics field names set to `identity_bearing`.
    pub identity_bearing_semantics: Vec<&'static str>,
}

/// The safety envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyEnvelope {
    /// Document schema tag.
    pub schema: String,
    /// Active profile name.
    pub profile: String,
    /// Always `true`: the envelope only ever describes a strict-mode posture.
    pub strict: bool,
    /// The profile's SPEL semantics.
    pub semantics: SpelSemantics,
    /// Domains declaring a non-default tie-break strategy, sorted by `domain_id`.
    pub domain_overrides: Vec<DomainOverride>,
    /// Derived posture summary.
    pub summary: Summary,
}

/// Envelope plus its stable hash.
#[derive(Debug, Clone)]
pub struct HashedSafetyEnvelope {
    /// The envelope.
    pub envelope: SafetyEnvelope,
    /// `sha256_hex(stable_stringify(envelope) + "\n")`.
    pub hash_sha256: String,
}

/// Builds the safety envelope for `profile`'s semantics and `registry`'s domains.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn build(profile: &str, semantics: &SpelSemantics, registry: &DomainRegistry) -> Result<HashedSafetyEnvelope, PsysError> {
    let mut domain_overrides: Vec<DomainOverride> = registry
        .domains
        .iter()
        .filter(|d| d.compose_tiebreak_strategy.is_some() || d.remediation_any_of_strategy.is_some())
        .map(|d| DomainOverride {
            domain_id: d.id.clone(),
            compose_tiebreak_strategy: d.compose_tiebreak_strategy,
            remediation_any_of_strategy: d.remediation_any_of_strategy,
        })
        .collect();
    domain_overrides.sort_by(|a, b| a.domain_id.cmp(&b.domain_id));

    let safety_first_taint_domains: Vec<String> = registry
        .domains
        .iter()
        .filter(|d| d.compose_tiebreak_strategy == Some(ComposeTiebreakStrategy::SafetyFirstTaint))
        .map(|d| d.id.clone())
        .collect();
    let safety_first_remediation_domains: Vec<String> = registry
        .domains
        .iter()
        .filter(|d| d.remediation_any_of_strategy == Some(RemediationAnyOfStrategy::SafetyFirst))
        .map(|d| d.id.clone())
        .collect();

    let mut identity_bearing_semantics = Vec::new();
    for (name, mode) in [
        ("endorsement", semantics.endorsement),
        ("declassification", semantics.declassification),
        ("control_flow", semantics.control_flow),
        ("termination", semantics.termination),
        ("timing", semantics.timing),
    ] {
        if mode == SpelMode::IdentityBearing {
            identity_bearing_semantics.push(name);
        }
    }

    let envelope = SafetyEnvelope {
        schema: SCHEMA.to_string(),
        profile: profile.to_string(),
        strict: true,
        semantics: semantics.clone(),
        domain_overrides,
        summary: Summary {
            safety_first_taint_domains,
            safety_first_remediation_domains,
            identity_bearing_semantics,
        },
    };
    let hash_sha256 = psys_core::hash_artifact(&envelope)?;
    Ok(HashedSafetyEnvelope { envelope, hash_sha256 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use psys_core::Domain;
    use std::collections::BTreeMap;

    fn semantics(endorsement: SpelMode) -> SpelSemantics {
        SpelSemantics {
            endorsement,
            declassification: SpelMode::MeaningPreserving,
            control_flow: SpelMode::MeaningPreserving,
            termination: SpelMode::MeaningPreserving,
            timing: SpelMode::MeaningPreserving,
            extensions: BTreeMap::new(),
        }
    }

    fn domain(id: &str, compose: Option<ComposeTiebreakStrategy>, remediation: Option<RemediationAnyOfStrategy>) -> Domain {
        Domain {
            id: id.into(),
            name: id.into(),
            summary: String::new(),
            reason_for_existence: String::new(),
            unique_invariants: Vec::new(),
            collapse_risk: String::new(),
            compose_tiebreak_strategy: compose,
            remediation_any_of_strategy: remediation,
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn domain_with_no_overrides_is_excluded() {
        let registry = DomainRegistry {
            domains: vec![domain("d.a", None, None)],
            neutral_domain: None,
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: BTreeMap::new(),
        };
        let env = build("ship", &semantics(SpelMode::MeaningPreserving), &registry).unwrap().envelope;
        assert!(env.domain_overrides.is_empty());
    }

    #[test]
    fn safety_first_taint_domain_is_summarized() {
        let registry = DomainRegistry {
            domains: vec![domain("d.a", Some(ComposeTiebreakStrategy::SafetyFirstTaint), None)],
            neutral_domain: None,
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: BTreeMap::new(),
        };
        let env = build("ship", &semantics(SpelMode::MeaningPreserving), &registry).unwrap().envelope;
        assert_eq!(env.summary.safety_first_taint_domains, vec!["d.a".to_string()]);
        assert_eq!(env.domain_overrides.len(), 1);
    }

    #[test]
    fn identity_bearing_endorsement_is_reported() {
        let registry = DomainRegistry {
            domains: vec![],
            neutral_domain: None,
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: BTreeMap::new(),
        };
        let env = build("ship", &semantics(SpelMode::IdentityBearing), &registry).unwrap().envelope;
        assert_eq!(env.summary.identity_bearing_semantics, vec!["endorsement"]);
    }

    #[test]
    fn hash_is_deterministic() {
        let registry = DomainRegistry {
            domains: vec![domain("d.a", Some(ComposeTiebreakStrategy::SafetyFirstTaint), None)],
            neutral_domain: None,
            neutral_domains: Vec::new(),
            immiscible: Vec::new(),
            extensions: BTreeMap::new(),
        };
        let a = build("ship", &semantics(SpelMode::MeaningPreserving), &registry).unwrap();
        let b = build("ship", &semantics(SpelMode::MeaningPreserving), &registry).unwrap();
        assert_eq!(a.hash_sha256, b.hash_sha256);
    }
}
