// SPDX-License-Identifier: MIT OR Apache-2.0
//! The four combining algorithms (§4.18): a typed generalization of the donor
//! `abp-policy::compose::PolicyPrecedence` enum's `DenyOverrides`/`AllowOverrides`/
//! `FirstApplicable`, plus `only_one_applicable`, a variant the donor never needed.

use serde::{Deserialize, Serialize};

/// One combined link's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Permitted.
    Permit,
    /// Denied.
    Deny,
    /// No applicable link resolved.
    Abstain,
}

impl Decision {
    /// Parses the loader's raw decision string. Returns `None` for anything but `"permit"`,
    /// `"deny"`, or `"abstain"`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "permit" => Some(Self::Permit),
            "deny" => Some(Self::Deny),
            "abstain" => Some(Self::Abstain),
            _ => None,
        }
    }
}

/// One ordered link contributing a decision to a combining run.
#[derive(Debug, Clone)]
pub struct Link {
    /// Link id; links are ordered by this field, ascending, before combining.
    pub id: String,
    /// The link's decision.
    pub decision: Decision,
}

/// The four combining algorithms §4.18 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Any `deny` among the ordered links wins.
    DenyOverrides,
    /// Any `permit` among the ordered links wins.
    PermitOverrides,
    /// The first non-abstaining link, in id order, wins.
    FirstApplicable,
    /// Exactly one link may resolve non-abstain; more than one is an error.
    OnlyOneApplicable,
}

impl Algorithm {
    /// Parses the loader's raw algorithm string. Returns `None` for anything outside the four
    /// known names (the loader turns that into `StrategyRegistryBadAlgorithm`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "deny_overrides" => Some(Self::DenyOverrides),
            "permit_overrides" => Some(Self::PermitOverrides),
            "first_applicable" => Some(Self::FirstApplicable),
            "only_one_applicable" => Some(Self::OnlyOneApplicable),
            _ => None,
        }
    }

    /// The canonical string form, matching the loader's raw field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DenyOverrides => "deny_overrides",
            Self::PermitOverrides => "permit_overrides",
            Self::FirstApplicable => "first_applicable",
            Self::OnlyOneApplicable => "only_one_applicable",
        }
    }

    /// Resolves `links` (already sorted by id, ascending) into a single decision.
    ///
    /// `only_one_applicable` returns `Err(n)` with the count of non-abstaining links when more
    /// than one resolves non-abstain; every other algorithm never fails.
    pub fn resolve(self, links: &[Link]) -> Result<Decision, usize> {
        match self {
            Self::DenyOverrides => {
                if links.iter().any(|l| l.decision == Decision::Deny) {
                    return Ok(Decision::Deny);
                }
                if links.iter().any(|l| l.decision == Decision::Permit) {
                    return Ok(Decision::Permit);
                }
                Ok(Decision::Abstain)
            }
            Self::PermitOverrides => {
                if links.iter().any(|l| l.decision == Decision::Permit) {
                    return Ok(Decision::Permit);
                }
                if links.iter().any(|l| l.decision == Decision::Deny) {
                    return Ok(Decision::Deny);
                }
                Ok(Decision::Abstain)
            }
            Self::FirstApplicable => Ok(links
                .iter()
                .find(|l| l.decision != Decision::Abstain)
                .map_or(Decision::Abstain, |l| l.decision)),
            Self::OnlyOneApplicable => {
                let applicable: Vec<&Link> = links.iter().filter(|l| l.decision != Decision::Abstain).collect();
                match applicable.len() {
                    0 => Ok(Decision::Abstain),
                    1 => Ok(applicable[0].decision),
                    n => Err(n),
                }
            }
        }
    }
}

/// Sorts `links` by `id`, ascending, as §4.18 requires before applying any algorithm.
pub fn order_links(links: &mut [Link]) {
    links.sort_by(|a, b| a.id.cmp(&b.id));
}
