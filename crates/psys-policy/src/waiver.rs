// SPDX-License-Identifier: MIT OR Apache-2.0
//! Waiver resolution (§4.6.3): a live waiver suppresses a matching violation but leaves a scar; an
//! expired waiver suppresses nothing and becomes an error in its own right.

use chrono::NaiveDate;
use psys_core::Waiver;
use serde::Serialize;

/// Target name used by compound-scoped waivers.
pub const COMPOUND_TARGET: &str = "compound";

/// Audit record attached to a violation that a live waiver suppressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaiverScars {
    /// What the waiver targets.
    pub target: String,
    /// Why the waiver was granted.
    pub rationale: String,
    /// Compensating controls.
    pub mitigations: Vec<String>,
    /// Date the waiver stops suppressing, formatted `YYYY-MM-DD`.
    pub expires_on: String,
}

impl From<&Waiver> for WaiverScars {
    fn from(w: &Waiver) -> Self {
        Self {
            target: w.target.clone(),
            rationale: w.rationale.clone(),
            mitigations: w.mitigations.clone(),
            expires_on: w.expires_on.to_string(),
        }
    }
}

/// Outcome of matching a rule violation against a compound's waiver list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaiverResolution {
    /// No waiver named this rule id for this target.
    NotWaived,
    /// A live waiver suppresses this violation.
    Suppressed(WaiverScars),
    /// A waiver named this rule id but has expired: it no longer suppresses, and itself becomes
    /// an error.
    Expired(WaiverScars),
}

/// Resolves `rule_id` against `waivers` (all scoped to `target`, e.g. `"compound"`, `"system"`, or
/// a `"link:<from>-><to>"` reference) as of `as_of`. The first matching waiver wins.
#[must_use]
pub fn resolve<'a>(rule_id: &str, target: &str, waivers: impl IntoIterator<Item = &'a Waiver>, as_of: NaiveDate) -> WaiverResolution {
    let Some(waiver) = waivers
        .into_iter()
        .find(|w| w.rule_id == rule_id && w.target == target)
    else {
        return WaiverResolution::NotWaived;
    };
    let scars = WaiverScars::from(waiver);
    if waiver.is_expired(as_of) {
        WaiverResolution::Expired(scars)
    } else {
        WaiverResolution::Suppressed(scars)
    }
}
