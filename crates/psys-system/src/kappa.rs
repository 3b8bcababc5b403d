// SPDX-License-Identifier: MIT OR Apache-2.0
//! Kappa canonicalization: a system graph's alias/order-invariant canonical form and hash
//! (§4.11).
//!
//! The "external κ tool" and the in-process fallback implemented here are both meant to satisfy
//! one trait, [`KappaTool`], mirroring the donor `abp-capability` crate's habit of abstracting a
//! subprocess-backed capability behind a trait so callers never need to know which
//! implementation answered (see its `SupportLevel`/`negotiate()` split). Only the in-process
//! fallback ships in this crate; a host free to link an external κ tool implements the trait
//! itself.

use psys_core::{CanonicalValue, SystemCompoundRef, SystemLink};
use psys_error::PsysError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Canonicalized form of a system graph, plus its stable hash.
#[derive(Debug, Clone)]
pub struct KappaOutput {
    /// The canonical value, already sorted and ready to re-hash or embed in a receipt.
    pub kappa: serde_json::Value,
    /// `sha256(stable_stringify(kappa))`.
    pub kappa_hash: String,
    /// Digest over the alias-to-canonical-name relabeling sequence used to build `kappa`.
    ///
    /// Only an external κ tool that actually performs graph relabeling can populate this; the
    /// in-process fallback here canonicalizes by sorting rather than relabeling nodes, so it has
    /// no relabeling sequence to hash and always reports `None` (§9 open question: nullability is
    /// accepted for the in-process path).
    pub node_map_digest: Option<String>,
}

/// Abstracts "turn a system graph into its canonical form" behind a trait, so an external κ tool
/// and the in-process fallback are interchangeable to callers.
pub trait KappaTool {
    /// Canonicalizes `system` and hashes the result.
    ///
    /// # Errors
    ///
    /// Propagates [`psys_core::stable_stringify`]'s error if the canonical value cannot be
    /// serialized.
    fn canonicalize(&self, system: &psys_core::System) -> Result<KappaOutput, PsysError>;
}

/// The only [`KappaTool`] implementation this crate ships: canonicalizes purely by sorting, with
/// no subprocess and no node relabeling.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessKappaTool;

#[derive(Serialize)]
struct CanonicalSystem<'a> {
    id: &'a str,
    compounds: Vec<&'a SystemCompoundRef>,
    links: Vec<&'a SystemLink>,
    waivers: Vec<CanonicalWaiver<'a>>,
    extensions: &'a BTreeMap<String, CanonicalValue>,
}

#[derive(Serialize)]
struct CanonicalWaiver<'a> {
    rule_id: &'a str,
    target: &'a str,
    rationale: &'a str,
    mitigations: Vec<&'a str>,
    expires_on: chrono::NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    x_missing: Option<Vec<&'a str>>,
    extensions: &'a BTreeMap<String, CanonicalValue>,
}

fn link_sort_key(link: &SystemLink) -> String {
    format!(
        "{}|{}|{}|{}",
        link.from,
        link.to,
        link.via.cap,
        link.via.endorsement_id.as_deref().unwrap_or("")
    )
}

impl KappaTool for InProcessKappaTool {
    fn canonicalize(&self, system: &psys_core::System) -> Result<KappaOutput, PsysError> {
        let mut compounds: Vec<&SystemCompoundRef> = system.compounds.iter().collect();
        compounds.sort_by(|a, b| a.alias.cmp(&b.alias));

        let mut links: Vec<&SystemLink> = system.links.iter().collect();
        links.sort_by_key(|l| link_sort_key(l));

        let mut waivers: Vec<CanonicalWaiver<'_>> = system
            .waivers
            .iter()
            .map(|w| {
                let mut mitigations: Vec<&str> = w.mitigations.iter().map(String::as_str).collect();
                mitigations.sort_unstable();
                CanonicalWaiver {
                    rule_id: &w.rule_id,
                    target: &w.target,
                    rationale: &w.rationale,
                    mitigations,
                    expires_on: w.expires_on,
                    x_missing: w.x_missing.as_ref().map(|v| v.iter().map(String::as_str).collect()),
                    extensions: &w.extensions,
                }
            })
            .collect();
        waivers.sort_by(|a, b| (a.rule_id, a.target).cmp(&(b.rule_id, b.target)));

        let canonical = CanonicalSystem { id: &system.id, compounds, links, waivers, extensions: &system.extensions };

        let kappa_text = psys_core::stable_stringify(&canonical)?;
        let kappa_hash = psys_core::sha256_hex(kappa_text.as_bytes());
        let kappa = serde_json::to_value(&canonical)
            .map_err(|e| PsysError::new(psys_error::ErrorCode::SchemaIo, format!("kappa value not serializable: {e}")))?;

        Ok(KappaOutput { kappa, kappa_hash, node_map_digest: None })
    }
}
