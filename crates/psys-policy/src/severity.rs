// SPDX-License-Identifier: MIT OR Apache-2.0
//! Severity resolution (§4.6.2): a profile's per-rule override wins over a rule's declared
//! severity.

use psys_core::{BondRule, Profile};
use psys_error::Severity;

/// The effective severity of `rule` under `profile`: the profile's `severity_overrides` entry for
/// this rule id if present, otherwise the rule's own declared severity.
#[must_use]
pub fn resolve(rule: &BondRule, profile: &Profile) -> Severity {
    profile
        .severity_overrides
        .get(&rule.id)
        .copied()
        .unwrap_or_else(|| rule.severity.into())
}
