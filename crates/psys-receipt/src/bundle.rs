// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bundle Exporter (§4.17): a single-file proof capsule bundling the receipt, its DSSE envelope,
//! the safety envelope, and the public key used to sign it.

use psys_error::PsysError;
use psys_trace::SafetyEnvelope;
use serde::Serialize;

use crate::dsse::DsseEnvelope;
use crate::receipt::Receipt;

/// The exported proof bundle, written as `stable_stringify(bundle) + "\n"`.
#[derive(Debug, Clone, Serialize)]
pub struct ProofBundle {
    /// `"spel.proof_bundle_dsse.v1"`.
    pub schema: String,
    /// Active profile name.
    pub profile: String,
    /// The receipt's own hash, duplicated at the top level for quick verification.
    pub receipt_hash_sha256: String,
    /// The SPEL semantics block's hash.
    pub spel_semantics_hash_sha256: String,
    /// The safety envelope.
    pub safety_envelope: SafetyEnvelope,
    /// The safety envelope's hash.
    pub safety_envelope_hash_sha256: String,
    /// The profile contract's hash.
    pub profile_contract_hash_sha256: String,
    /// The full receipt.
    pub receipt: Receipt,
    /// The DSSE envelope wrapping the receipt bytes.
    pub dsse_envelope: DsseEnvelope,
    /// PEM-encoded public key the envelope verifies against.
    pub public_key_pem: String,
}

/// A written bundle and its own hash.
#[derive(Debug, Clone)]
pub struct HashedBundle {
    /// The bundle.
    pub bundle: ProofBundle,
    /// `sha256(stable_stringify(bundle) + "\n")`.
    pub hash_sha256: String,
}

/// Assembles and hashes a [`ProofBundle`].
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
#[allow(clippy::too_many_arguments)]
pub fn export(
    profile: impl Into<String>,
    receipt_hash_sha256: impl Into<String>,
    spel_semantics_hash_sha256: impl Into<String>,
    safety_envelope: SafetyEnvelope,
    safety_envelope_hash_sha256: impl Into<String>,
    profile_contract_hash_sha256: impl Into<String>,
    receipt: Receipt,
    dsse_envelope: DsseEnvelope,
    public_key_pem: impl Into<String>,
) -> Result<HashedBundle, PsysError> {
    let bundle = ProofBundle {
        schema: "spel.proof_bundle_dsse.v1".to_string(),
        profile: profile.into(),
        receipt_hash_sha256: receipt_hash_sha256.into(),
        spel_semantics_hash_sha256: spel_semantics_hash_sha256.into(),
        safety_envelope,
        safety_envelope_hash_sha256: safety_envelope_hash_sha256.into(),
        profile_contract_hash_sha256: profile_contract_hash_sha256.into(),
        receipt,
        dsse_envelope,
        public_key_pem: public_key_pem.into(),
    };
    let hash_sha256 = psys_core::hash_artifact(&bundle)?;
    Ok(HashedBundle { bundle, hash_sha256 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ReceiptBuilder;
    use crate::dsse::DsseSignature;
    use crate::test_support::{proof_graph, safety_envelope};

    fn sample_receipt() -> Receipt {
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
    fn export_sets_the_fixed_schema_tag() {
        let envelope = DsseEnvelope {
            payload_type: "application/vnd.psys.receipt+json".into(),
            payload: "cGF5bG9hZA==".into(),
            signatures: vec![DsseSignature { keyid: "sha256:abc".into(), sig: "c2ln".into() }],
        };
        let hashed = export(
            "ship",
            "a".repeat(64),
            "b".repeat(64),
            safety_envelope().envelope,
            "c".repeat(64),
            "d".repeat(64),
            sample_receipt(),
            envelope,
            "-----BEGIN PUBLIC KEY-----\n...\n-----END PUBLIC KEY-----\n",
        )
        .unwrap();
        assert_eq!(hashed.bundle.schema, "spel.proof_bundle_dsse.v1");
        assert_eq!(hashed.hash_sha256.len(), 64);
    }

    #[test]
    fn export_hash_changes_when_the_receipt_changes() {
        let envelope = DsseEnvelope { payload_type: "t".into(), payload: "cA==".into(), signatures: vec![] };
        let mut receipt_a = sample_receipt();
        let mut receipt_b = sample_receipt();
        receipt_a.receipt_hash_sha256 = Some("1".repeat(64));
        receipt_b.receipt_hash_sha256 = Some("2".repeat(64));
        let a = export("ship", "x", "y", safety_envelope().envelope, "z", "w", receipt_a, envelope.clone(), "pem").unwrap();
        let b = export("ship", "x", "y", safety_envelope().envelope, "z", "w", receipt_b, envelope, "pem").unwrap();
        assert_ne!(a.hash_sha256, b.hash_sha256);
    }
}
