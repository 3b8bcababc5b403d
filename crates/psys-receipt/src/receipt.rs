// SPDX-License-Identifier: MIT OR Apache-2.0
//! The receipt shape (§4.15): verifier identity, policy digests, input attestations, target κ
//! commitment, every trace-view hash, the proof graph and safety envelope with their hashes,
//! the strategy-registry hash, and per-system κ/obligations commitments.
//!
//! No field here carries a wall-clock timestamp or run-generation-time identifier — a verifier
//! identity is a static description of the evaluator binary, never a log of when it ran.

use psys_trace::{ProofGraph, SafetyEnvelope};
use serde::{Deserialize, Serialize};

/// Static description of the evaluator binary that produced a receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifierIdentity {
    /// Stable identifier for the evaluator, e.g. `"psys-eval"`.
    pub id: String,
    /// Evaluator version string (crate version, not a build timestamp).
    pub version: String,
    /// Derived signing keyid, if this receipt is destined to be signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyid: Option<String>,
}

/// A bare SHA-256 digest, wrapped so it serializes as `{"sha256": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sha256Digest {
    /// Hex-encoded digest.
    pub sha256: String,
}

impl Sha256Digest {
    /// Wraps a hex digest string.
    #[must_use]
    pub fn new(sha256: impl Into<String>) -> Self {
        Self { sha256: sha256.into() }
    }
}

/// `policy{uri, digest.sha256=profile_contract_hash, semantics_digest.sha256}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyRef {
    /// Source URI the active profile was loaded from.
    pub uri: String,
    /// The profile contract's own hash (`profile_contract_hash_sha256`).
    pub digest: Sha256Digest,
    /// The SPEL semantics block's hash (`spel_semantics_hash_sha256`).
    pub semantics_digest: Sha256Digest,
}

/// One entry of `input_attestations[]`: a named digest the receipt commits to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputAttestation {
    /// `"profile_contract"`, `"semantics"`, or `"kappa_index"`.
    pub kind: String,
    /// The attested artifact's SHA-256 hex digest.
    pub sha256: String,
}

/// The evaluation target's κ commitment: which compound or system this receipt speaks for, and
/// that target's own canonical hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetCommitment {
    /// `"compound"` or `"system"`.
    pub kind: String,
    /// The target's id.
    pub id: String,
    /// For a system target, `KappaOutput::kappa_hash`; for a compound target, the compound
    /// document's own `hash_artifact`.
    pub kappa_hash_sha256: String,
}

/// `explain_trace_v2` through `v6.2`'s stable hashes, named per view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceHashes {
    /// v2 hash.
    pub v2: String,
    /// v3 hash.
    pub v3: String,
    /// v6 hash.
    pub v6: String,
    /// v6.1 hash.
    #[serde(rename = "v6_1")]
    pub v6_1: String,
    /// v6.2 hash.
    #[serde(rename = "v6_2")]
    pub v6_2: String,
}

/// One system's κ and obligations commitment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemCommitment {
    /// The system's id.
    pub system_id: String,
    /// `KappaOutput::kappa_hash` for this system's graph.
    pub kappa_hash_sha256: String,
    /// `sha256(stable_stringify(obligations) + "\n")` over the sorted list of that system's
    /// unresolved obligation misses (rule id + missing evidence/requires ids), empty list when
    /// the system has none.
    pub obligations_hash_sha256: String,
}

/// The composed receipt (§4.15). `receipt_hash_sha256` is `None` while the struct is being
/// canonicalized for hashing and `Some` once [`crate::compute_hash`] has run.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    /// Static evaluator identity.
    pub verifier: VerifierIdentity,
    /// Active policy and its digests.
    pub policy: PolicyRef,
    /// Profile contract, semantics, and κ(index) attestations, sorted by `kind`.
    pub input_attestations: Vec<InputAttestation>,
    /// The compound or system this receipt evaluates.
    pub target: TargetCommitment,
    /// Every explain-trace view's stable hash.
    pub trace_hashes: TraceHashes,
    /// The proof graph.
    pub proof_graph: ProofGraph,
    /// `sha256(stable_stringify(proof_graph) + "\n")`.
    pub proof_graph_hash_sha256: String,
    /// The safety envelope.
    pub safety_envelope: SafetyEnvelope,
    /// `sha256(stable_stringify(safety_envelope) + "\n")`.
    pub safety_envelope_hash_sha256: String,
    /// Hash of the full strategy registry document this run conformance-checked against.
    pub strategy_registry_hash_sha256: String,
    /// Per-system κ and obligations commitments, sorted by `system_id`.
    pub systems: Vec<SystemCommitment>,
    /// `SHA-256(stable_stringify(self) + "\n")` with this field itself nulled out first. `None`
    /// until [`crate::compute_hash`] has been called.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_hash_sha256: Option<String>,
}
