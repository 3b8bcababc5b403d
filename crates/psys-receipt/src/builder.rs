// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fluent receipt assembly, generalized from the donor `ReceiptBuilder` — same builder-then-`.build()`
//! shape, but every donor field that carried a wall-clock timestamp or run-generation-time id
//! (`started_at`, `finished_at`, `work_order_id`, `run_id`) has no counterpart here (§4.15).

use psys_error::{ErrorCode, PsysError};
use psys_trace::{ProofGraph, SafetyEnvelope};

use crate::receipt::{
    InputAttestation, PolicyRef, Receipt, Sha256Digest, SystemCommitment, TargetCommitment, TraceHashes,
    VerifierIdentity,
};

/// Builds a [`Receipt`] field by field; every setter is required before [`ReceiptBuilder::build`]
/// succeeds except `keyid`, which is only known once a signing key is chosen.
#[derive(Debug, Clone, Default)]
pub struct ReceiptBuilder {
    verifier: Option<VerifierIdentity>,
    policy_uri: Option<String>,
    profile_contract_hash: Option<String>,
    semantics_hash: Option<String>,
    kappa_index_hash: Option<String>,
    target: Option<TargetCommitment>,
    trace_hashes: Option<TraceHashes>,
    proof_graph: Option<ProofGraph>,
    proof_graph_hash: Option<String>,
    safety_envelope: Option<SafetyEnvelope>,
    safety_envelope_hash: Option<String>,
    strategy_registry_hash: Option<String>,
    systems: Vec<SystemCommitment>,
}

impl ReceiptBuilder {
    /// Starts an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the static evaluator identity. `keyid` is left `None`; DSSE signing fills it in.
    #[must_use]
    pub fn verifier(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.verifier = Some(VerifierIdentity { id: id.into(), version: version.into(), keyid: None });
        self
    }

    /// Sets the active profile's source URI and the profile-contract / semantics digests that
    /// feed both `policy{}` and `input_attestations[]`.
    #[must_use]
    pub fn policy(
        mut self,
        uri: impl Into<String>,
        profile_contract_hash: impl Into<String>,
        semantics_hash: impl Into<String>,
    ) -> Self {
        self.policy_uri = Some(uri.into());
        self.profile_contract_hash = Some(profile_contract_hash.into());
        self.semantics_hash = Some(semantics_hash.into());
        self
    }

    /// Sets the κ(index) digest, the third `input_attestations[]` entry.
    #[must_use]
    pub fn kappa_index_digest(mut self, hash: impl Into<String>) -> Self {
        self.kappa_index_hash = Some(hash.into());
        self
    }

    /// Sets the evaluation target's κ commitment.
    #[must_use]
    pub fn target(mut self, kind: impl Into<String>, id: impl Into<String>, kappa_hash_sha256: impl Into<String>) -> Self {
        self.target = Some(TargetCommitment { kind: kind.into(), id: id.into(), kappa_hash_sha256: kappa_hash_sha256.into() });
        self
    }

    /// Sets all five explain-trace view hashes.
    #[must_use]
    pub fn trace_hashes(mut self, v2: impl Into<String>, v3: impl Into<String>, v6: impl Into<String>, v6_1: impl Into<String>, v6_2: impl Into<String>) -> Self {
        self.trace_hashes = Some(TraceHashes { v2: v2.into(), v3: v3.into(), v6: v6.into(), v6_1: v6_1.into(), v6_2: v6_2.into() });
        self
    }

    /// Sets the proof graph and its hash.
    #[must_use]
    pub fn proof_graph(mut self, graph: ProofGraph, hash_sha256: impl Into<String>) -> Self {
        self.proof_graph = Some(graph);
        self.proof_graph_hash = Some(hash_sha256.into());
        self
    }

    /// Sets the safety envelope and its hash.
    #[must_use]
    pub fn safety_envelope(mut self, envelope: SafetyEnvelope, hash_sha256: impl Into<String>) -> Self {
        self.safety_envelope = Some(envelope);
        self.safety_envelope_hash = Some(hash_sha256.into());
        self
    }

    /// Sets the strategy registry's own hash.
    #[must_use]
    pub fn strategy_registry_hash(mut self, hash_sha256: impl Into<String>) -> Self {
        self.strategy_registry_hash = Some(hash_sha256.into());
        self
    }

    /// Appends one system's κ/obligations commitment. Sorted by `system_id` at [`Self::build`].
    #[must_use]
    pub fn add_system(mut self, commitment: SystemCommitment) -> Self {
        self.systems.push(commitment);
        self
    }

    /// Assembles the [`Receipt`]. `receipt_hash_sha256` is left `None`; call
    /// [`crate::compute_hash`] to fill it in.
    ///
    /// # Errors
    ///
    /// Returns [`PsysError`] with [`ErrorCode::SchemaMissingField`] naming the first unset
    /// required field.
    pub fn build(mut self) -> Result<Receipt, PsysError> {
        let missing = |field: &str| PsysError::new(ErrorCode::SchemaMissingField, format!("receipt builder: missing {field}")).with_context("field", field);

        let verifier = self.verifier.take().ok_or_else(|| missing("verifier"))?;
        let uri = self.policy_uri.take().ok_or_else(|| missing("policy_uri"))?;
        let profile_contract_hash = self.profile_contract_hash.take().ok_or_else(|| missing("profile_contract_hash"))?;
        let semantics_hash = self.semantics_hash.take().ok_or_else(|| missing("semantics_hash"))?;
        let kappa_index_hash = self.kappa_index_hash.take().ok_or_else(|| missing("kappa_index_hash"))?;
        let target = self.target.take().ok_or_else(|| missing("target"))?;
        let trace_hashes = self.trace_hashes.take().ok_or_else(|| missing("trace_hashes"))?;
        let proof_graph = self.proof_graph.take().ok_or_else(|| missing("proof_graph"))?;
        let proof_graph_hash_sha256 = self.proof_graph_hash.take().ok_or_else(|| missing("proof_graph_hash"))?;
        let safety_envelope = self.safety_envelope.take().ok_or_else(|| missing("safety_envelope"))?;
        let safety_envelope_hash_sha256 = self.safety_envelope_hash.take().ok_or_else(|| missing("safety_envelope_hash"))?;
        let strategy_registry_hash_sha256 = self.strategy_registry_hash.take().ok_or_else(|| missing("strategy_registry_hash"))?;

        let mut systems = std::mem::take(&mut self.systems);
        systems.sort_by(|a, b| a.system_id.cmp(&b.system_id));

        let mut input_attestations = vec![
            InputAttestation { kind: "profile_contract".into(), sha256: profile_contract_hash.clone() },
            InputAttestation { kind: "semantics".into(), sha256: semantics_hash.clone() },
            InputAttestation { kind: "kappa_index".into(), sha256: kappa_index_hash },
        ];
        input_attestations.sort_by(|a, b| a.kind.cmp(&b.kind));

        Ok(Receipt {
            verifier,
            policy: PolicyRef { uri, digest: Sha256Digest::new(profile_contract_hash), semantics_digest: Sha256Digest::new(semantics_hash) },
            input_attestations,
            target,
            trace_hashes,
            proof_graph,
            proof_graph_hash_sha256,
            safety_envelope,
            safety_envelope_hash_sha256,
            strategy_registry_hash_sha256,
            systems,
            receipt_hash_sha256: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{proof_graph, safety_envelope};

    fn built() -> Receipt {
        let graph = proof_graph();
        let envelope = safety_envelope();
        ReceiptBuilder::new()
            .verifier("psys-eval", "0.1.0")
            .policy("file:///profiles.v1.json", "a".repeat(64), "b".repeat(64))
            .kappa_index_digest("c".repeat(64))
            .target("system", "system.demo", "d".repeat(64))
            .trace_hashes("v2", "v3", "v6", "v6.1", "v6.2")
            .proof_graph(graph.graph, graph.hash_sha256)
            .safety_envelope(envelope.envelope, envelope.hash_sha256)
            .strategy_registry_hash("g".repeat(64))
            .build()
            .unwrap()
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = ReceiptBuilder::new().verifier("psys-eval", "0.1.0").build().unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaMissingField);
    }

    #[test]
    fn input_attestations_are_sorted_by_kind() {
        let receipt = built();
        let kinds: Vec<&str> = receipt.input_attestations.iter().map(|a| a.kind.as_str()).collect();
        let mut sorted = kinds.clone();
        sorted.sort_unstable();
        assert_eq!(kinds, sorted);
        assert_eq!(kinds, vec!["kappa_index", "profile_contract", "semantics"]);
    }

    #[test]
    fn systems_are_sorted_by_id() {
        let graph = proof_graph();
        let envelope = safety_envelope();
        let receipt = ReceiptBuilder::new()
            .verifier("psys-eval", "0.1.0")
            .policy("file:///profiles.v1.json", "a".repeat(64), "b".repeat(64))
            .kappa_index_digest("c".repeat(64))
            .target("system", "system.z", "d".repeat(64))
            .trace_hashes("v2", "v3", "v6", "v6.1", "v6.2")
            .proof_graph(graph.graph, graph.hash_sha256)
            .safety_envelope(envelope.envelope, envelope.hash_sha256)
            .strategy_registry_hash("g".repeat(64))
            .add_system(SystemCommitment { system_id: "system.z".into(), kappa_hash_sha256: "1".repeat(64), obligations_hash_sha256: "2".repeat(64) })
            .add_system(SystemCommitment { system_id: "system.a".into(), kappa_hash_sha256: "3".repeat(64), obligations_hash_sha256: "4".repeat(64) })
            .build()
            .unwrap();
        assert_eq!(receipt.systems[0].system_id, "system.a");
        assert_eq!(receipt.systems[1].system_id, "system.z");
    }

    #[test]
    fn receipt_hash_sha256_is_none_until_compute_hash_runs() {
        assert!(built().receipt_hash_sha256.is_none());
    }
}
