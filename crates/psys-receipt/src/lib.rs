// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-receipt
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Receipt Assembler, DSSE Signer/Verifier, and Bundle Exporter (§4.15-§4.17): composes a
//! verifier identity, policy digests, input attestations, every trace-view hash, the proof graph
//! and safety envelope, and per-system κ/obligations commitments into one canonically hashed
//! receipt; signs it with Ed25519 under the DSSE v1 envelope format; and exports a single-file
//! proof bundle.
//!
//! No field anywhere in the hashed [`Receipt`] carries a wall-clock timestamp or
//! run-generation-time identifier (see [`receipt`] module docs) — that is the one deliberate
//! divergence from the donor `abp-receipt` crate this was generalized from, whose `Receipt`
//! embedded `started_at`/`finished_at` directly in the hashed struct.

/// The receipt shape: verifier identity, policy digests, trace hashes, proof graph, safety
/// envelope, and per-system commitments.
pub mod receipt;
/// Fluent receipt assembly.
pub mod builder;
/// κ(index): the loaded index document canonicalized with its volatile wiring fields stripped.
pub mod kappa_index;
/// DSSE PAE encoding, Ed25519 signing/verification, and keyid derivation.
pub mod dsse;
/// Single-file proof bundle export.
pub mod bundle;

pub use builder::ReceiptBuilder;
pub use bundle::{export as export_bundle, HashedBundle, ProofBundle};
pub use dsse::{derive_keyid, pae, public_key_to_pem, sign as dsse_sign, signing_key_from_pem, verify as dsse_verify, DsseEnvelope, DsseSignature};
pub use kappa_index::kappa_index;
pub use receipt::{
    InputAttestation, PolicyRef, Receipt, Sha256Digest, SystemCommitment, TargetCommitment, TraceHashes, VerifierIdentity,
};

use psys_error::PsysError;

/// Serializes `receipt` with `receipt_hash_sha256` nulled out, as the bytes that feed the hash.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn canonicalize(receipt: &Receipt) -> Result<String, PsysError> {
    let mut unhashed = receipt.clone();
    unhashed.receipt_hash_sha256 = None;
    psys_core::stable_stringify(&unhashed)
}

/// Computes `receipt_hash_sha256` and returns a copy of `receipt` with it filled in.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn compute_hash(receipt: &Receipt) -> Result<Receipt, PsysError> {
    let text = canonicalize(receipt)?;
    let hash = psys_core::sha256_hex(format!("{text}\n").as_bytes());
    let mut hashed = receipt.clone();
    hashed.receipt_hash_sha256 = Some(hash);
    Ok(hashed)
}

/// Returns `true` if `receipt.receipt_hash_sha256` matches its recomputed hash.
#[must_use]
pub fn verify_hash(receipt: &Receipt) -> bool {
    let Some(declared) = receipt.receipt_hash_sha256.as_ref() else {
        return false;
    };
    match canonicalize(receipt) {
        Ok(text) => psys_core::sha256_hex(format!("{text}\n").as_bytes()) == *declared,
        Err(_) => false,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ReceiptBuilder;
    use crate::test_support::{proof_graph, safety_envelope};

    fn sample() -> Receipt {
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
    fn compute_hash_then_verify_hash_round_trips() {
        let hashed = compute_hash(&sample()).unwrap();
        assert!(hashed.receipt_hash_sha256.is_some());
        assert!(verify_hash(&hashed));
    }

    #[test]
    fn verify_hash_is_false_with_no_hash_set() {
        assert!(!verify_hash(&sample()));
    }

    #[test]
    fn verify_hash_is_false_after_a_field_is_tampered() {
        let mut hashed = compute_hash(&sample()).unwrap();
        hashed.policy.uri = "file:///tampered.json".to_string();
        assert!(!verify_hash(&hashed));
    }

    #[test]
    fn compute_hash_is_deterministic() {
        let a = compute_hash(&sample()).unwrap();
        let b = compute_hash(&sample()).unwrap();
        assert_eq!(a.receipt_hash_sha256, b.receipt_hash_sha256);
    }

    #[test]
    fn canonicalize_never_embeds_its_own_hash() {
        let text = canonicalize(&sample()).unwrap();
        assert!(!text.contains("receipt_hash_sha256"));
    }
}
