// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data model for the Periodic System: elements, bond rules/packs, domains, compounds, systems,
//! waivers, profiles, and SPEL semantics.
//!
//! These types are produced exclusively by the loader and held by value inside an
//! `EvaluationContext`; nothing downstream mutates them (see the ownership note in the top-level
//! design notes).

use chrono::NaiveDate;
use psys_error::Severity;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// A JSON value restricted to hash-safe leaves: no non-finite floats, no non-safe-integer
/// numbers. Used for the `x_`/`x.` extension namespace, which must canonicalize and hash exactly
/// like the rest of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CanonicalValue(pub serde_json::Value);

impl CanonicalValue {
    /// `true` if every number nested in this value is finite and within `f64`'s safe-integer
    /// range when it has no fractional part.
    #[must_use]
    pub fn is_hash_safe(&self) -> bool {
        fn check(v: &serde_json::Value) -> bool {
            match v {
                serde_json::Value::Number(n) => n.as_f64().is_some_and(f64::is_finite),
                serde_json::Value::Array(items) => items.iter().all(check),
                serde_json::Value::Object(map) => map.values().all(check),
                _ => true,
            }
        }
        check(&self.0)
    }
}

/// One of the five element tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Observable behavior / outcome elements.
    Experience,
    /// Process/tooling elements.
    Workshop,
    /// Capability-bearing elements (membrane surface).
    Capability,
    /// Evidence elements bindable to obligations.
    Evidence,
    /// Invariant/principle elements.
    Principle,
}

impl Table {
    /// Ranking used by the `safety_first` remediation tie-break strategy: lower ranks first.
    #[must_use]
    pub fn safety_first_rank(self) -> u8 {
        match self {
            Table::Principle => 0,
            Table::Evidence => 1,
            Table::Workshop => 2,
            Table::Capability => 3,
            Table::Experience => 4,
        }
    }
}

/// Returns `true` if `id` matches the identifier grammar `^[a-z][a-z0-9._-]*$` shared by element,
/// rule, pack, domain, and negative-case ids.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
}

/// A named unit in one of the five tables.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Element {
    /// Identifier, matching [`is_valid_id`].
    pub id: String,
    /// Table this element belongs to.
    pub table: Table,
    /// Grouping label within the table.
    pub group: String,
    /// Display name.
    pub name: String,
    /// One-line summary.
    pub summary: String,
    /// Owning domain, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Tag set. At most one `irreversible.*` tag is allowed.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Ordered list of states this element may require downstream.
    #[serde(default)]
    pub required_states: Vec<String>,
    /// Element ids this element implies.
    #[serde(default)]
    pub implies: Vec<String>,
    /// Element ids this element requires.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Invariant element ids this element depends on.
    #[serde(default)]
    pub invariants: Vec<String>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

impl Element {
    /// Number of `irreversible.*` tags on this element (must be at most 1).
    #[must_use]
    pub fn irreversible_tag_count(&self) -> usize {
        self.tags.iter().filter(|t| t.starts_with("irreversible.")).count()
    }

    /// All element ids this element references (`implies` ∪ `requires` ∪ `invariants`).
    pub fn referenced_ids(&self) -> impl Iterator<Item = &str> {
        self.implies
            .iter()
            .chain(self.requires.iter())
            .chain(self.invariants.iter())
            .map(String::as_str)
    }
}

/// `when{}` clause of a [`BondRule`]. Every present field is AND-ed with the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WhenClause {
    /// Compound must contain at least one of these element ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<String>>,
    /// Compound must contain every one of these element ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<String>>,
    /// Compound's element tag union must intersect these tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_tag: Option<Vec<String>>,
    /// Compound must contain an element from at least one of these tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_any_of: Option<Vec<Table>>,
}

impl WhenClause {
    /// A `when{}` with no predicates at all is forbidden at load time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.any_of.is_none()
            && self.all_of.is_none()
            && self.any_tag.is_none()
            && self.table_any_of.is_none()
    }
}

/// A single `{element_id, must_include[]}` state requirement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StateRequirement {
    /// Element that must be present.
    pub element_id: String,
    /// States the element's `required_states` must cover.
    pub must_include: Vec<String>,
}

/// `require{}` clause of a [`BondRule`]. Every present field must independently be satisfied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RequireClause {
    /// Every listed element id must be present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<String>>,
    /// At least one listed element id must be present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<String>>,
    /// Per-element required-state coverage checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_requirements: Option<Vec<StateRequirement>>,
    /// Shorthand requiring `exp.value.tx_status`'s `required_states` to cover this list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<String>>,
    /// Invariant names that must appear in the compound's `invariants[]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invariants: Option<Vec<String>>,
}

impl RequireClause {
    /// A `require{}` with no obligations at all is forbidden at load time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_of.is_none()
            && self.any_of.is_none()
            && self.state_requirements.is_none()
            && self.states.is_none()
            && self.invariants.is_none()
    }
}

/// Declared severity of a [`BondRule`] before any profile override is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    /// Blocks `ok` unconditionally.
    Error,
    /// Blocks `ok` only in strict mode.
    Warn,
}

impl From<RuleSeverity> for Severity {
    fn from(s: RuleSeverity) -> Self {
        match s {
            RuleSeverity::Error => Severity::Error,
            RuleSeverity::Warn => Severity::Warn,
        }
    }
}

/// A `(when, require)` predicate-and-obligation rule over compounds.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BondRule {
    /// Identifier, unique across base rules ∪ enabled pack rules.
    pub id: String,
    /// Trigger predicate.
    pub when: WhenClause,
    /// Obligation to satisfy once triggered.
    pub require: RequireClause,
    /// Human-readable violation message.
    pub message: String,
    /// Declared severity.
    pub severity: RuleSeverity,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// A named set of [`BondRule`]s scoped to one or more domains.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BondPack {
    /// Identifier, unique among all packs.
    pub id: String,
    /// Path to the pack's `bond_rules.v1.json` file.
    pub path: String,
    /// Domains this pack applies to. Must include the pack's own id by convention.
    pub domains: Vec<String>,
    /// Whether this pack is enabled absent an explicit profile selection.
    #[serde(default)]
    pub default_enabled: bool,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// Tie-break strategy used when a domain's rules compose with another domain's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComposeTiebreakStrategy {
    /// Pick the lexicographically smallest candidate.
    LexicographicSmallest,
    /// Prefer the domain carrying a `safety_first_taint` classification.
    SafetyFirstTaint,
}

/// Tie-break strategy used to pick one element out of a `require.any_of` remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAnyOfStrategy {
    /// Pick the lexicographically smallest missing id.
    LexicographicSmallest,
    /// Rank by table (principle < evidence < workshop < capability < experience), then
    /// lexicographically.
    SafetyFirst,
}

/// A constraint regime. Membrane (neutral) domains are always miscible.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Domain {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-line summary.
    pub summary: String,
    /// Why this domain exists as distinct from others.
    pub reason_for_existence: String,
    /// Invariants unique to this domain.
    #[serde(default)]
    pub unique_invariants: Vec<String>,
    /// Description of the risk of collapsing this domain into another.
    pub collapse_risk: String,
    /// Strategy used when composing this domain's rules with another's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose_tiebreak_strategy: Option<ComposeTiebreakStrategy>,
    /// Strategy used to pick a remediation element out of a `require.any_of` miss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_any_of_strategy: Option<RemediationAnyOfStrategy>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// An unordered pair of domain ids that must never co-occur in one compound.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImmisciblePair(pub String, pub String);

impl ImmisciblePair {
    /// `true` if this pair names `{a, b}` in either order.
    #[must_use]
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.0 == a && self.1 == b) || (self.0 == b && self.1 == a)
    }
}

/// The full set of declared domains plus neutral-domain and immiscibility metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainRegistry {
    /// All declared domains.
    pub domains: Vec<Domain>,
    /// Single neutral domain, if declared this way.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neutral_domain: Option<String>,
    /// Multiple neutral domains, if declared this way.
    #[serde(default)]
    pub neutral_domains: Vec<String>,
    /// Unordered pairs of domains that must never co-occur in one compound.
    #[serde(default)]
    pub immiscible: Vec<ImmisciblePair>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

impl DomainRegistry {
    /// All neutral domain ids, from both `neutral_domain` and `neutral_domains[]`.
    pub fn all_neutral_domains(&self) -> impl Iterator<Item = &str> {
        self.neutral_domain
            .iter()
            .map(String::as_str)
            .chain(self.neutral_domains.iter().map(String::as_str))
    }

    /// `true` if `id` is one of the declared neutral domains.
    #[must_use]
    pub fn is_neutral(&self, id: &str) -> bool {
        self.all_neutral_domains().any(|n| n == id)
    }

    /// `true` if `a` and `b` are listed as an immiscible pair.
    #[must_use]
    pub fn are_immiscible(&self, a: &str, b: &str) -> bool {
        self.immiscible.iter().any(|p| p.matches(a, b))
    }

    /// Looks up a domain by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.id == id)
    }
}

/// A dated exception for a specific rule on a specific target.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Waiver {
    /// Rule this waiver suppresses, while still valid.
    pub rule_id: String,
    /// What the waiver targets (a compound, `"system"`, or a `"link:<from>-><to>"` reference).
    pub target: String,
    /// Why the waiver is granted.
    pub rationale: String,
    /// Compensating controls; must be non-empty.
    pub mitigations: Vec<String>,
    /// Date the waiver stops suppressing.
    pub expires_on: NaiveDate,
    /// Listing of absent obligations this waiver is covering, for audit readability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_missing: Option<Vec<String>>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

impl Waiver {
    /// `true` if this waiver no longer suppresses as of `as_of` (and should itself be reported as
    /// an error).
    #[must_use]
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expires_on < as_of
    }
}

/// Evidence-binding discipline for a [`Compound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceBindingMode {
    /// Evidence obligations are satisfied by element presence alone.
    #[default]
    ImplicitById,
    /// Evidence obligations additionally require an explicit `evidence_bindings` entry.
    ExplicitOnly,
}

/// A bag of elements plus invariants; the evaluation target for bond rules.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Compound {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Version tag of the element tables this compound was authored against.
    pub tables_version: String,
    /// Element ids in this compound. Must be unique and resolve in the element index.
    pub elements: Vec<String>,
    /// Declared domain, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Additional invariant names asserted by this compound.
    #[serde(default)]
    pub invariants: Vec<String>,
    /// Free-text single-line annotation, at most 280 characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director_notes: Option<String>,
    /// Waivers scoped to this compound.
    #[serde(default)]
    pub waivers: Vec<Waiver>,
    /// Evidence-binding discipline.
    #[serde(default)]
    pub evidence_binding_mode: EvidenceBindingMode,
    /// Per-rule explicit evidence bindings, used only when `evidence_binding_mode` is
    /// `explicit_only`.
    #[serde(default)]
    pub evidence_bindings: BTreeMap<String, Vec<String>>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

impl Compound {
    /// `true` if `director_notes` is set and violates the single-line/280-char constraint.
    #[must_use]
    pub fn director_notes_invalid(&self) -> bool {
        match &self.director_notes {
            Some(notes) => notes.len() > 280 || notes.contains('\n'),
            None => false,
        }
    }
}

/// One `{as, path}` member of a [`System`]'s compound list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SystemCompoundRef {
    /// Alias used by links to refer to this compound within the system.
    #[serde(rename = "as")]
    pub alias: String,
    /// Path to the compound document.
    pub path: String,
}

/// The `via{}` payload of a [`SystemLink`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LinkVia {
    /// Neutral-domain capability this link crosses through.
    pub cap: String,
    /// Free-text annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Required for `identity_bearing` link groups; must be unique within the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endorsement_id: Option<String>,
}

/// A cross-compound link within a [`System`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SystemLink {
    /// Source compound alias.
    pub from: String,
    /// Destination compound alias.
    pub to: String,
    /// Membrane crossing details.
    pub via: LinkVia,
}

/// A compound graph: a named set of aliased compounds connected by links.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct System {
    /// Identifier, by convention starting with `system.`.
    pub id: String,
    /// Aliased compound members.
    pub compounds: Vec<SystemCompoundRef>,
    /// Cross-compound links.
    #[serde(default)]
    pub links: Vec<SystemLink>,
    /// System-scoped waivers.
    #[serde(default)]
    pub waivers: Vec<Waiver>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// A named policy configuration: enabled packs plus severity overrides.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    /// Profile name. The loader defaults this to `"ship"` when absent.
    #[serde(default = "default_profile_name")]
    pub name: String,
    /// Per-rule severity overrides.
    #[serde(default)]
    pub severity_overrides: BTreeMap<String, Severity>,
    /// Packs enabled under this profile.
    #[serde(default)]
    pub enabled_packs: Vec<String>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

fn default_profile_name() -> String {
    "ship".to_string()
}

/// One of the five SPEL behavior dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpelMode {
    /// The operation preserves identity across the boundary.
    IdentityBearing,
    /// The operation preserves meaning, but not identity, across the boundary.
    MeaningPreserving,
}

impl<'de> Deserialize<'de> for SpelMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "identity_bearing" => Ok(SpelMode::IdentityBearing),
            // Legacy spelling, normalized on load; never re-emitted.
            "meaning_preserving" | "post_condition" => Ok(SpelMode::MeaningPreserving),
            other => Err(serde::de::Error::custom(format!(
                "unknown spel mode {other:?}, expected identity_bearing or meaning_preserving"
            ))),
        }
    }
}

/// The five SPEL semantics modes, each identity-bearing or meaning-preserving.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpelSemantics {
    /// Semantics of endorsement links.
    pub endorsement: SpelMode,
    /// Semantics of declassification links.
    pub declassification: SpelMode,
    /// Semantics of control-flow links.
    pub control_flow: SpelMode,
    /// Semantics of termination links.
    pub termination: SpelMode,
    /// Semantics of timing links.
    pub timing: SpelMode,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}
