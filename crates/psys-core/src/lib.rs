// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The stable data model and canonicalization primitives for the provenance evaluator.
//!
//! If you only take one dependency from this workspace, take this one: every other crate builds
//! on the types in [`model`] and the hashing helpers in [`canon`].

/// Canonical JSON serialization and SHA-256 hashing.
pub mod canon;
/// Periodic System data model: elements, bond rules/packs, domains, compounds, systems, waivers,
/// profiles, SPEL semantics.
pub mod model;

pub use canon::{hash_artifact, sha256_hex, stable_stringify, stable_stringify_value};
pub use model::{
    BondPack, BondRule, CanonicalValue, Compound, ComposeTiebreakStrategy, Domain,
    DomainRegistry, Element, EvidenceBindingMode, ImmisciblePair, LinkVia, Profile,
    RemediationAnyOfStrategy, RequireClause, RuleSeverity, SpelMode, SpelSemantics,
    StateRequirement, System, SystemCompoundRef, SystemLink, Table, Waiver, WhenClause,
    is_valid_id,
};

/// Current schema family version string embedded in every `schema` field this crate expects,
/// e.g. `periodic.element.v1`.
///
/// # Examples
///
/// ```
/// assert_eq!(psys_core::SCHEMA_PREFIX, "periodic");
/// ```
pub const SCHEMA_PREFIX: &str = "periodic";

/// Builds the expected `schema` string for a document kind and version, e.g.
/// `schema_id("element", 1) == "periodic.element.v1"`.
#[must_use]
pub fn schema_id(kind: &str, version: u32) -> String {
    format!("{SCHEMA_PREFIX}.{kind}.v{version}")
}
