// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-trace
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Explain Trace Builder (§4.12), Proof Graph v1 (§4.13), and Safety Envelope (§4.14): the
//! explainability layer built from collected rule violations, each stage with its own stable hash
//! for binding into the receipt.

/// Trace entries, collected from rule evaluation outcomes (§4.12).
pub mod entry;
/// Proof graph v1, derived from the v6.1/v6.2 trace views (§4.13).
pub mod proof_graph;
/// Safety envelope: profile semantics + domain tie-break posture (§4.14).
pub mod safety_envelope;
/// Progressively richer trace views: v2, v3, v6, v6.1, v6.2 (§4.12).
pub mod views;

pub use entry::{build as build_entry, sort_entries, EntryKind, ElementRef, TraceContext, TraceEntry};
pub use proof_graph::{build as build_proof_graph, Edge, EdgeRel, HashedGraph, Node, NodeKind, ProofGraph, ProofGraphMeta};
pub use safety_envelope::{build as build_safety_envelope, DomainOverride, HashedSafetyEnvelope, SafetyEnvelope, Summary};
pub use views::{build_v2, build_v3, build_v6, build_v6_1, build_v6_2, HashedView};
