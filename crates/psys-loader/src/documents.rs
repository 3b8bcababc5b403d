// SPDX-License-Identifier: MIT OR Apache-2.0
//! Document types with no dedicated home in [`psys_core::model`]: the top-level index, and the
//! small auxiliary corpora (core tags, table metadata, flow/workshop pairs, negative-example
//! cases, domain-completion entries, atomic properties, golden corpus).

use psys_core::CanonicalValue;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level index document naming every other input file by relative path.
///
/// Field names match the "volatile wiring fields" the receipt assembler strips before hashing
/// `κ(index)` (see the Receipt Assembler's index-κ computation).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Index {
    /// Expected `periodic.index.v1`.
    pub schema: String,
    /// Table name → path to that table's element document.
    pub tables: BTreeMap<String, String>,
    /// Path to `bond_rules.v1.json` (base rules).
    pub bond_rules: String,
    /// Path to `bond_packs.v1.json`.
    pub bond_packs: String,
    /// Path to `profiles.v1.json`.
    pub profiles: String,
    /// Path to `domains.v1.json`.
    pub domains: String,
    /// Path to `core_tags.v1.json`.
    pub core_tags: String,
    /// Path to `table_metadata.v1.json`.
    pub table_metadata: String,
    /// Path to `atomic_properties.v1.json`.
    pub atomic_properties: String,
    /// Path to `spel_semantics.v1.json`.
    pub spel_semantics: String,
    /// Path to `domain_completion.v1.json`.
    pub domain_completion: String,
    /// Path to `flow_workshop_pairs.v1.json`.
    pub flow_workshop_pairs: String,
    /// Path to `golden_corpus.v1.json` (the global positive-example corpus).
    pub examples: String,
    /// Path to `negative_examples.v1.json`.
    pub negative_examples: String,
    /// Path to `system_negative_examples.v1.json`.
    pub system_negative_examples: String,
    /// Path to the `systems/` directory.
    pub systems: String,
    /// Path to `strategies/strategy_registry.v1.json`.
    pub strategies: String,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// `core_tags.v1.json`: the closed vocabulary of tags elements may carry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CoreTags {
    /// Expected `periodic.core_tags.v1`.
    pub schema: String,
    /// Declared tag names, sorted.
    pub tags: Vec<String>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// One table's metadata entry in `table_metadata.v1.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableMeta {
    /// Display name for the table.
    pub name: String,
    /// One-line description.
    #[serde(default)]
    pub summary: String,
}

/// `table_metadata.v1.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableMetadata {
    /// Expected `periodic.table_metadata.v1`.
    pub schema: String,
    /// Table id → metadata.
    pub tables: BTreeMap<String, TableMeta>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// A single `{flow, workshop, severity, message}` pairing requirement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlowWorkshopPair {
    /// Flow element id that, if present, requires `workshop`.
    pub flow: String,
    /// Workshop element id required alongside `flow`.
    pub workshop: String,
    /// Severity of the resulting violation when `workshop` is missing.
    pub severity: psys_core::RuleSeverity,
    /// Violation message.
    pub message: String,
}

/// `flow_workshop_pairs.v1.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlowWorkshopPairs {
    /// Expected `periodic.flow_workshop_pairs.v1`.
    pub schema: String,
    /// The pairing requirements.
    pub pairs: Vec<FlowWorkshopPair>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// One negative-example case: a compound or system expected to fail evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NegativeExampleCase {
    /// Unique case id.
    pub id: String,
    /// Path to the target compound or system document.
    pub path: String,
    /// Rule ids expected to produce an error.
    #[serde(default)]
    pub expect_errors: Vec<String>,
    /// Rule ids expected to produce a warning.
    #[serde(default)]
    pub expect_warnings: Vec<String>,
}

/// `negative_examples.v1.json` / `system_negative_examples.v1.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NegativeExamples {
    /// Expected `periodic.negative_examples.v1` (or the system variant).
    pub schema: String,
    /// The negative cases.
    pub cases: Vec<NegativeExampleCase>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// One entry of `domain_completion.v1.json`: the quorum requirement for a `complete` pack.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainCompletionEntry {
    /// `"complete"` or some other declared status; only `"complete"` triggers the gate.
    pub status: String,
    /// Rule ids belonging to this pack (must be non-empty when `status == "complete"`).
    #[serde(default)]
    pub rules: Vec<String>,
    /// Minimum positive examples required.
    #[serde(default)]
    pub min_positive_examples: u32,
    /// Minimum negative examples required.
    #[serde(default)]
    pub min_negative_examples: u32,
}

/// `domain_completion.v1.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainCompletion {
    /// Expected `periodic.domain_completion.v1`.
    pub schema: String,
    /// Pack id → completion entry.
    pub packs: BTreeMap<String, DomainCompletionEntry>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// One global positive-example entry: a compound id plus the pack ids it exercises.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GoldenExample {
    /// Compound id.
    pub compound_id: String,
    /// Pack ids this compound is a positive example for.
    #[serde(default)]
    pub packs: Vec<String>,
}

/// `golden_corpus.v1.json`: the global positive-example corpus used by the domain-completion
/// gate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GoldenCorpus {
    /// Expected `periodic.golden_corpus.v1`.
    pub schema: String,
    /// The positive examples.
    pub examples: Vec<GoldenExample>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// `atomic_properties.v1.json`: free-form structural properties asserted about element
/// atomicity. Only the schema is validated here; the payload is opaque and passed through.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AtomicProperties {
    /// Expected `periodic.atomic_properties.v1`.
    pub schema: String,
    /// Opaque, already-canonical-safe payload.
    #[serde(flatten)]
    pub properties: BTreeMap<String, CanonicalValue>,
}

/// `combining{}` block of a strategy registry entry. `algorithm` is kept as a raw string rather
/// than a closed enum: an unrecognized value is reported as `StrategyRegistryBadAlgorithm` by the
/// loader rather than aborting the whole document, the same treatment `DomainCompletionEntry`
/// gives its `status` field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Combining {
    /// One of `deny_overrides`, `permit_overrides`, `first_applicable`, `only_one_applicable`.
    pub algorithm: String,
}

/// One link's resolved effect, either a live link feeding a real evaluation or a counterexample
/// fixture's scripted input. `decision` is `"permit"`, `"deny"`, or `"abstain"`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LinkEffect {
    /// Link id; fixtures are ordered by this field, ascending, before combining.
    pub id: String,
    /// The effect's decision.
    pub decision: String,
}

/// One counterexample fixture attached to a strategy entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StrategyFixture {
    /// Fixture family label, used only for the violation message on mismatch.
    pub family: String,
    /// Link effects feeding the combining algorithm, before id-ascending ordering.
    pub links: Vec<LinkEffect>,
    /// Expected combined decision for this fixture.
    pub expected: String,
}

/// One `strategies/strategy_registry.v1.json` entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StrategyEntry {
    /// Unique, non-empty strategy id.
    pub strategy_id: String,
    /// Strategy kind label (free-form, echoed into the canonical-semantics hash).
    pub kind: String,
    /// Human-readable name (free-form, echoed into the canonical-semantics hash).
    pub name: String,
    /// The combining algorithm this strategy applies.
    pub combining: Combining,
    /// `sha256_hex(stable_stringify({strategy_id, kind, name, combining:{algorithm}}) )`.
    pub canonical_semantics_hash_sha256: String,
    /// Counterexample fixtures exercising this strategy's resolution rule.
    #[serde(default)]
    pub fixtures: Vec<StrategyFixture>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}

/// `strategies/strategy_registry.v1.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StrategyRegistry {
    /// Expected `periodic.strategy_registry.v1`.
    pub schema: String,
    /// The registered strategies.
    pub strategies: Vec<StrategyEntry>,
    /// `x_`/`x.` extension payload.
    #[serde(default)]
    pub extensions: BTreeMap<String, CanonicalValue>,
}
