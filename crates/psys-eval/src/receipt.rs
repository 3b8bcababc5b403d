// SPDX-License-Identifier: MIT OR Apache-2.0
//! Assembles the final [`Receipt`] from a loaded corpus, every system's evaluation, and the
//! built trace views (§4.15).

use psys_core::hash_artifact;
use psys_error::{ErrorCode, PsysError};
use psys_receipt::{kappa_index, Receipt, ReceiptBuilder, SystemCommitment};

use crate::corpus::LoadedCorpus;
use crate::system::SystemEvaluation;
use crate::trace::TraceViews;

/// Evaluator identity embedded in every receipt this crate produces.
pub const VERIFIER_ID: &str = "psys-eval";
/// Evaluator version embedded in every receipt. Tracks this crate's own `Cargo.toml` version.
pub const VERIFIER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Assembles an unsigned [`Receipt`] committing to `corpus`'s profile/semantics/κ(index), every
/// system's κ and obligations, and `views`' trace hashes, proof graph, and safety envelope.
///
/// The receipt's single `target` names the lexicographically-first system id among
/// `system_evaluations` — a corpus may declare several systems, but a receipt speaks for one
/// primary target while still committing to every system's obligations via `systems[]`.
///
/// # Errors
///
/// Returns a fatal [`PsysError`] if `system_evaluations` is empty (nothing to commit to as the
/// receipt's target), or if any artifact fails to canonicalize.
pub fn assemble(
    corpus: &LoadedCorpus,
    system_evaluations: &[SystemEvaluation],
    views: &TraceViews,
    profile_uri: &str,
) -> Result<Receipt, PsysError> {
    let Some(primary) = system_evaluations.iter().min_by(|a, b| a.system.id.cmp(&b.system.id)) else {
        return Err(PsysError::new(
            ErrorCode::SchemaMissingField,
            "no systems found to evaluate; receipt requires at least one target",
        ));
    };

    let profile_contract_hash = hash_artifact(&corpus.profile)?;
    let semantics_hash = hash_artifact(&corpus.spel_semantics)?;
    let (_, kappa_index_hash) = kappa_index(&corpus.index)?;
    let strategy_registry_hash = hash_artifact(&corpus.strategy_registry)?;

    let mut builder = ReceiptBuilder::new()
        .verifier(VERIFIER_ID, VERIFIER_VERSION)
        .policy(profile_uri, profile_contract_hash, semantics_hash)
        .kappa_index_digest(kappa_index_hash)
        .target("system", primary.system.id.as_str(), primary.kappa.kappa_hash.as_str())
        .trace_hashes(
            views.v2.hash_sha256.as_str(),
            views.v3.hash_sha256.as_str(),
            views.v6.hash_sha256.as_str(),
            views.v6_1.hash_sha256.as_str(),
            views.v6_2.hash_sha256.as_str(),
        )
        .proof_graph(views.proof_graph.graph.clone(), views.proof_graph.hash_sha256.as_str())
        .safety_envelope(
            views.safety_envelope.envelope.clone(),
            views.safety_envelope.hash_sha256.as_str(),
        )
        .strategy_registry_hash(strategy_registry_hash);

    for evaluation in system_evaluations {
        builder = builder.add_system(SystemCommitment {
            system_id: evaluation.system.id.clone(),
            kappa_hash_sha256: evaluation.kappa.kappa_hash.clone(),
            obligations_hash_sha256: evaluation.obligations_hash_sha256.clone(),
        });
    }

    builder.build()
}
