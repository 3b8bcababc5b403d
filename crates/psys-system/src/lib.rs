// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-system
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Domain federation (declared-vs-inferred domain checks, immiscibility, domain→pack
//! enforcement, flow↔workshop pairing), cross-compound system graph evaluation, and kappa
//! canonicalization: the layer above `psys-policy` that reasons about a compound's place in a
//! domain and a system of linked compounds rather than a compound in isolation.

/// Declared-vs-inferred domain checks, immiscibility, domain→pack enforcement, and
/// flow↔workshop pairing for a single compound (§4.7).
pub mod federation;
/// Kappa canonicalization of a system graph (§4.11).
pub mod kappa;
/// Cross-compound link and system-waiver validation (§4.8).
pub mod link;

pub use federation::{
    infer as infer_domain, validate_declared_domain, validate_flow_workshop_pairing,
    validate_immiscibility, validate_pack_enforcement, DomainInference,
};
pub use kappa::{InProcessKappaTool, KappaOutput, KappaTool};
pub use link::{tag_member_violations, validate_links, validate_waivers};
