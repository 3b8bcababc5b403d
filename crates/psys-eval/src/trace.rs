// SPDX-License-Identifier: MIT OR Apache-2.0
//! Turns rule outcomes into trace entries and, when tracing is requested, the richer v2..v6.2
//! views, proof graph, and safety envelope (§4.12-§4.14).
//!
//! Every triggered rule failure becomes a [`TraceEntry`] regardless of whether `--trace` was
//! passed: its `atom`/`remediation` shape (not a generic [`Violation`]) is what the final report's
//! `errors`/`warnings` entries for rule obligations actually look like. `--trace` only decides
//! whether the derived views, proof graph, and safety envelope are additionally built and
//! attached to the report.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use psys_core::{Compound, DomainRegistry, SpelSemantics};
use psys_error::{ErrorCode, Severity, Violation};
use psys_trace::{
    build_entry, build_proof_graph, build_safety_envelope, build_v2, build_v3, build_v6,
    build_v6_1, build_v6_2, sort_entries, EntryKind, HashedGraph, HashedSafetyEnvelope,
    HashedView, TraceContext, TraceEntry,
};

use crate::compound::RuleOutcome;

/// Builds one [`TraceEntry`] per rule outcome that produced a violation (passing outcomes yield
/// `None` and are skipped).
pub fn build_entries(
    outcomes: &[RuleOutcome],
    compound: &Compound,
    kind: EntryKind,
    profile: &str,
    policy_uri: &str,
) -> Vec<TraceEntry> {
    outcomes
        .iter()
        .filter_map(|outcome| {
            let ctx = TraceContext {
                profile,
                policy_uri,
                kind,
                compound_id: Some(compound.id.as_str()),
                source_pack: outcome.source_pack.as_str(),
            };
            build_entry(&outcome.rule, &outcome.evaluation, compound, &ctx)
        })
        .collect()
}

/// Builds the `WAIVER_EXPIRED` violation for every rule outcome whose matched waiver had already
/// expired as of the run's `as_of` date (distinct from, and in addition to, the rule's own
/// obligation-miss entry).
pub fn expired_waiver_violations(outcomes: &[RuleOutcome]) -> Vec<Violation> {
    outcomes
        .iter()
        .filter(|o| o.evaluation.waiver_expired)
        .filter_map(|o| {
            let scars = o.evaluation.waiver_scars.as_ref()?;
            Some(
                Violation::new(
                    ErrorCode::WaiverExpired,
                    format!(
                        "waiver for rule {:?} expired on {}",
                        o.evaluation.rule_id, scars.expires_on
                    ),
                    Severity::Error,
                )
                .with_context("rule_id", &o.evaluation.rule_id)
                .with_context("expires_on", &scars.expires_on),
            )
        })
        .collect()
}

/// Every hashed view plus the proof graph and safety envelope, derived from one sorted entry set.
#[derive(Debug, Clone)]
pub struct TraceViews {
    /// Sorted trace entries feeding every view below.
    pub entries: Vec<TraceEntry>,
    /// The v2 view (entries only, no contract/semantics hash binding).
    pub v2: HashedView,
    /// The v3 view.
    pub v3: HashedView,
    /// The v6 view.
    pub v6: HashedView,
    /// The v6.1 view.
    pub v6_1: HashedView,
    /// The v6.2 view.
    pub v6_2: HashedView,
    /// The safety envelope.
    pub safety_envelope: HashedSafetyEnvelope,
    /// The proof graph, bound to the v6.1/v6.2/envelope hashes.
    pub proof_graph: HashedGraph,
}

impl Serialize for TraceViews {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TraceViews", 15)?;
        state.serialize_field("entries", &self.entries)?;
        state.serialize_field("v2", &self.v2.view)?;
        state.serialize_field("v2_hash_sha256", &self.v2.hash_sha256)?;
        state.serialize_field("v3", &self.v3.view)?;
        state.serialize_field("v3_hash_sha256", &self.v3.hash_sha256)?;
        state.serialize_field("v6", &self.v6.view)?;
        state.serialize_field("v6_hash_sha256", &self.v6.hash_sha256)?;
        state.serialize_field("v6_1", &self.v6_1.view)?;
        state.serialize_field("v6_1_hash_sha256", &self.v6_1.hash_sha256)?;
        state.serialize_field("v6_2", &self.v6_2.view)?;
        state.serialize_field("v6_2_hash_sha256", &self.v6_2.hash_sha256)?;
        state.serialize_field("safety_envelope", &self.safety_envelope.envelope)?;
        state.serialize_field(
            "safety_envelope_hash_sha256",
            &self.safety_envelope.hash_sha256,
        )?;
        state.serialize_field("proof_graph", &self.proof_graph.graph)?;
        state.serialize_field("proof_graph_hash_sha256", &self.proof_graph.hash_sha256)?;
        state.end()
    }
}

/// Builds every trace view, the safety envelope, and the proof graph from `entries` (already
/// collected from every compound/system evaluated this run).
///
/// # Errors
///
/// Propagates canonicalization failures from any view, the envelope, or the graph.
pub fn build_views(
    mut entries: Vec<TraceEntry>,
    profile_name: &str,
    contract_hash: &str,
    semantics: &SpelSemantics,
    domains: &DomainRegistry,
) -> Result<TraceViews, psys_error::PsysError> {
    sort_entries(&mut entries);

    let semantics_hash = psys_core::hash_artifact(semantics)?;

    let v2 = build_v2(&entries)?;
    let v3 = build_v3(&entries, contract_hash, &semantics_hash)?;
    let v6 = build_v6(&entries, contract_hash, &semantics_hash)?;
    let v6_1 = build_v6_1(&entries, contract_hash, &semantics_hash)?;
    let v6_2 = build_v6_2(&entries, contract_hash, &semantics_hash)?;

    let safety_envelope = build_safety_envelope(profile_name, semantics, domains)?;
    let proof_graph = build_proof_graph(
        &entries,
        v6_1.hash_sha256.clone(),
        v6_2.hash_sha256.clone(),
        safety_envelope.hash_sha256.clone(),
    )?;

    Ok(TraceViews {
        entries,
        v2,
        v3,
        v6,
        v6_1,
        v6_2,
        safety_envelope,
        proof_graph,
    })
}
