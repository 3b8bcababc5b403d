// SPDX-License-Identifier: MIT OR Apache-2.0
//! One `load_*` function per document type, each performing schema validation, closed-key
//! enforcement, sortedness/uniqueness checks, and fatal-vs-collected error handling.

use crate::documents::{
    AtomicProperties, CoreTags, DomainCompletion, FlowWorkshopPairs, GoldenCorpus, Index,
    NegativeExamples, StrategyRegistry, TableMetadata,
};
use crate::schema::{
    check_id_grammar, check_schema_id, check_unique_ids, promote_extensions, warn_if_not_sorted,
};
use psys_core::{BondPack, BondRule, Compound, Domain, DomainRegistry, Element, Profile, SpelSemantics, System};
use psys_error::{ErrorCode, PsysError, Severity, Violation};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A loaded value paired with the non-fatal violations collected while loading it.
#[derive(Debug)]
pub struct Loaded<T> {
    /// The best-effort parsed value.
    pub value: T,
    /// Violations collected while parsing (schema, closed-key, sortedness, uniqueness).
    pub violations: Vec<Violation>,
}

fn read_file(path: &Path) -> Result<String, PsysError> {
    fs::read_to_string(path)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("cannot read file: {e}"), path.display().to_string()))
}

fn load_value(path: &Path) -> Result<Value, PsysError> {
    let text = read_file(path)?;
    serde_json::from_str(&text)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("cannot parse JSON: {e}"), path.display().to_string()))
}

fn parse_item<T: DeserializeOwned>(
    item: Value,
    label: &str,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<T> {
    match serde_json::from_value(item) {
        Ok(v) => Some(v),
        Err(e) => {
            violations.push(
                Violation::new(ErrorCode::SchemaMissingField, format!("{label}: {e}"), Severity::Error)
                    .with_context("path", path),
            );
            None
        }
    }
}

/// Loads the top-level index document naming every other input file.
pub fn load_index(path: &Path) -> Result<Loaded<Index>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("index", 1), &path_str, &mut violations);
    promote_extensions(
        &mut doc,
        &[
            "schema", "tables", "bond_rules", "bond_packs", "profiles", "domains", "core_tags",
            "table_metadata", "atomic_properties", "spel_semantics", "domain_completion",
            "flow_workshop_pairs", "examples", "negative_examples", "system_negative_examples",
            "systems", "strategies",
        ],
        &path_str,
        &mut violations,
    );
    let value: Index = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("index document malformed: {e}"), path_str))?;
    Ok(Loaded { value, violations })
}

const ELEMENT_KEYS: &[&str] = &[
    "id", "table", "group", "name", "summary", "domain", "tags", "required_states", "implies",
    "requires", "invariants",
];

/// Loads one element table document and checks its declared `table` matches `expected_table_id`.
pub fn load_table(path: &Path, expected_table_id: &str) -> Result<Loaded<Vec<Element>>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("element", 1), &path_str, &mut violations);

    let declared_table = doc.get("table").and_then(Value::as_str).map(str::to_string);
    if declared_table.as_deref() != Some(expected_table_id) {
        violations.push(
            Violation::new(
                ErrorCode::SchemaWrongId,
                format!(
                    "table document declares {:?}, expected {expected_table_id:?}",
                    declared_table.unwrap_or_default()
                ),
                Severity::Error,
            )
            .with_context("path", &path_str),
        );
    }

    promote_extensions(&mut doc, &["schema", "table", "elements"], &path_str, &mut violations);
    let elements_raw = doc
        .get_mut("elements")
        .map(Value::take)
        .unwrap_or(Value::Array(Vec::new()));
    let Value::Array(items) = elements_raw else {
        return Ok(Loaded { value: Vec::new(), violations });
    };

    let mut elements = Vec::with_capacity(items.len());
    for mut item in items {
        promote_extensions(&mut item, ELEMENT_KEYS, &path_str, &mut violations);
        if let Some(e) = parse_item::<Element>(item, "element", &path_str, &mut violations) {
            elements.push(e);
        }
    }

    let ids: Vec<&str> = elements.iter().map(|e| e.id.as_str()).collect();
    check_id_grammar(&ids, "element", &path_str, &mut violations);
    check_unique_ids(&ids, "element", &path_str, &mut violations);
    warn_if_not_sorted(&elements, |e| e.id.as_str(), "elements[]", &path_str, &mut violations);

    Ok(Loaded { value: elements, violations })
}

const RULE_KEYS: &[&str] = &["id", "when", "require", "message", "severity"];

/// Loads `bond_rules.v1.json` (used for both base rules and a pack's own rules file).
pub fn load_rules(path: &Path) -> Result<Loaded<Vec<BondRule>>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("bond_rules", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "rules"], &path_str, &mut violations);

    let items = match doc.get_mut("rules").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let mut rules = Vec::with_capacity(items.len());
    for mut item in items {
        promote_extensions(&mut item, RULE_KEYS, &path_str, &mut violations);
        let Some(rule) = parse_item::<BondRule>(item, "bond rule", &path_str, &mut violations) else {
            continue;
        };
        if rule.when.is_empty() {
            violations.push(
                Violation::new(ErrorCode::RuleEmptyWhen, format!("rule {:?} has empty when{{}}", rule.id), Severity::Error)
                    .with_context("path", &path_str)
                    .with_context("rule_id", &rule.id),
            );
        }
        if rule.require.is_empty() {
            violations.push(
                Violation::new(ErrorCode::RuleEmptyRequire, format!("rule {:?} has empty require{{}}", rule.id), Severity::Error)
                    .with_context("path", &path_str)
                    .with_context("rule_id", &rule.id),
            );
        }
        rules.push(rule);
    }

    let ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
    check_id_grammar(&ids, "rule", &path_str, &mut violations);
    check_unique_ids(&ids, "rule", &path_str, &mut violations);
    warn_if_not_sorted(&rules, |r| r.id.as_str(), "rules[]", &path_str, &mut violations);

    Ok(Loaded { value: rules, violations })
}

const PACK_KEYS: &[&str] = &["id", "path", "domains", "default_enabled", "description"];

/// Loads `bond_packs.v1.json`.
pub fn load_packs(path: &Path) -> Result<Loaded<Vec<BondPack>>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("bond_packs", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "packs"], &path_str, &mut violations);

    let items = match doc.get_mut("packs").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let mut packs = Vec::with_capacity(items.len());
    for mut item in items {
        promote_extensions(&mut item, PACK_KEYS, &path_str, &mut violations);
        if let Some(p) = parse_item::<BondPack>(item, "bond pack", &path_str, &mut violations) {
            packs.push(p);
        }
    }

    let ids: Vec<&str> = packs.iter().map(|p| p.id.as_str()).collect();
    check_id_grammar(&ids, "pack", &path_str, &mut violations);
    check_unique_ids(&ids, "pack", &path_str, &mut violations);
    warn_if_not_sorted(&packs, |p| p.id.as_str(), "packs[]", &path_str, &mut violations);

    Ok(Loaded { value: packs, violations })
}

const DOMAIN_KEYS: &[&str] = &[
    "id", "name", "summary", "reason_for_existence", "unique_invariants", "collapse_risk",
    "compose_tiebreak_strategy", "remediation_any_of_strategy",
];

/// Loads `domains.v1.json` into a [`DomainRegistry`].
pub fn load_domains(path: &Path) -> Result<Loaded<DomainRegistry>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("domains", 1), &path_str, &mut violations);
    promote_extensions(
        &mut doc,
        &["schema", "domains", "neutral_domain", "neutral_domains", "immiscible"],
        &path_str,
        &mut violations,
    );

    if let Some(Value::Array(items)) = doc.get_mut("domains") {
        for item in items.iter_mut() {
            promote_extensions(item, DOMAIN_KEYS, &path_str, &mut violations);
        }
    }

    let registry: DomainRegistry = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("domains document malformed: {e}"), path_str.clone()))?;

    let ids: Vec<&str> = registry.domains.iter().map(|d| d.id.as_str()).collect();
    check_id_grammar(&ids, "domain", &path_str, &mut violations);
    check_unique_ids(&ids, "domain", &path_str, &mut violations);
    warn_if_not_sorted(&registry.domains, |d: &Domain| d.id.as_str(), "domains[]", &path_str, &mut violations);

    Ok(Loaded { value: registry, violations })
}

const PROFILE_KEYS: &[&str] = &["name", "severity_overrides", "enabled_packs"];

/// Loads `profiles.v1.json` and selects `requested` (or the profile named `"ship"` if `None`).
pub fn load_profiles(path: &Path, requested: Option<&str>) -> Result<Loaded<Profile>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("profiles", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "profiles"], &path_str, &mut violations);

    let items = match doc.get_mut("profiles").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let mut profiles = Vec::with_capacity(items.len());
    for mut item in items {
        promote_extensions(&mut item, PROFILE_KEYS, &path_str, &mut violations);
        if let Some(p) = parse_item::<Profile>(item, "profile", &path_str, &mut violations) {
            profiles.push(p);
        }
    }

    let wanted = requested.unwrap_or("ship");
    let selected = profiles.into_iter().find(|p| p.name == wanted).ok_or_else(|| {
        PsysError::new(ErrorCode::ReferenceUnknownPack, format!("no profile named {wanted:?}"))
            .with_context("path", &path_str)
    })?;

    Ok(Loaded { value: selected, violations })
}

const COMPOUND_KEYS: &[&str] = &[
    "id", "name", "tables_version", "elements", "domain", "invariants", "director_notes",
    "waivers", "evidence_binding_mode", "evidence_bindings",
];

/// Loads a single compound document.
pub fn load_compound(path: &Path) -> Result<Loaded<Compound>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("compound", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, COMPOUND_KEYS, &path_str, &mut violations);

    let compound: Compound = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("compound document malformed: {e}"), path_str.clone()))?;

    let elem_ids: Vec<&str> = compound.elements.iter().map(String::as_str).collect();
    check_unique_ids(&elem_ids, "compound element", &path_str, &mut violations);

    if compound.director_notes_invalid() {
        violations.push(
            Violation::new(
                ErrorCode::SchemaMissingField,
                format!("compound {:?} director_notes exceeds 280 chars or is multi-line", compound.id),
                Severity::Error,
            )
            .with_context("path", &path_str),
        );
    }

    Ok(Loaded { value: compound, violations })
}

const SYSTEM_KEYS: &[&str] = &["schema", "id", "compounds", "links", "waivers"];

/// Loads a single `system.*.json` document.
pub fn load_system(path: &Path) -> Result<Loaded<System>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("system", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, SYSTEM_KEYS, &path_str, &mut violations);

    let system: System = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("system document malformed: {e}"), path_str.clone()))?;

    if !system.id.starts_with("system.") {
        violations.push(
            Violation::new(ErrorCode::IdInvalid, format!("system id {:?} must start with \"system.\"", system.id), Severity::Error)
                .with_context("path", &path_str),
        );
    }
    let aliases: Vec<&str> = system.compounds.iter().map(|c| c.alias.as_str()).collect();
    check_unique_ids(&aliases, "system compound alias", &path_str, &mut violations);

    Ok(Loaded { value: system, violations })
}

const SPEL_KEYS: &[&str] = &["schema", "endorsement", "declassification", "control_flow", "termination", "timing"];

/// Loads `spel_semantics.v1.json`.
pub fn load_spel_semantics(path: &Path) -> Result<Loaded<SpelSemantics>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("spel_semantics", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, SPEL_KEYS, &path_str, &mut violations);

    let value: SpelSemantics = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("spel_semantics document malformed: {e}"), path_str))?;
    Ok(Loaded { value, violations })
}

/// Loads `core_tags.v1.json`.
pub fn load_core_tags(path: &Path) -> Result<Loaded<CoreTags>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("core_tags", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "tags"], &path_str, &mut violations);
    let value: CoreTags = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("core_tags document malformed: {e}"), path_str))?;
    Ok(Loaded { value, violations })
}

/// Loads `table_metadata.v1.json`.
pub fn load_table_metadata(path: &Path) -> Result<Loaded<TableMetadata>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("table_metadata", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "tables"], &path_str, &mut violations);
    let value: TableMetadata = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("table_metadata document malformed: {e}"), path_str))?;
    Ok(Loaded { value, violations })
}

/// Loads `atomic_properties.v1.json`.
pub fn load_atomic_properties(path: &Path) -> Result<Loaded<AtomicProperties>, PsysError> {
    let doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("atomic_properties", 1), &path_str, &mut violations);
    let value: AtomicProperties = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("atomic_properties document malformed: {e}"), path_str))?;
    Ok(Loaded { value, violations })
}

/// Loads `domain_completion.v1.json`.
pub fn load_domain_completion(path: &Path) -> Result<Loaded<DomainCompletion>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("domain_completion", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "packs"], &path_str, &mut violations);
    let value: DomainCompletion = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("domain_completion document malformed: {e}"), path_str))?;

    for (pack_id, entry) in &value.packs {
        if entry.status == "complete" && entry.rules.is_empty() {
            violations.push(
                Violation::new(
                    ErrorCode::DomainCompletionMissingRules,
                    format!("pack {pack_id:?} is declared complete but has no rules"),
                    Severity::Error,
                )
                .with_context("path", &path_str),
            );
        }
    }
    Ok(Loaded { value, violations })
}

/// Loads `flow_workshop_pairs.v1.json`.
pub fn load_flow_workshop_pairs(path: &Path) -> Result<Loaded<FlowWorkshopPairs>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("flow_workshop_pairs", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "pairs"], &path_str, &mut violations);
    let value: FlowWorkshopPairs = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("flow_workshop_pairs document malformed: {e}"), path_str))?;
    Ok(Loaded { value, violations })
}

fn load_negative_examples_doc(path: &Path, schema_kind: &str) -> Result<Loaded<NegativeExamples>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id(schema_kind, 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "cases"], &path_str, &mut violations);
    let value: NegativeExamples = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("{schema_kind} document malformed: {e}"), path_str.clone()))?;

    let ids: Vec<&str> = value.cases.iter().map(|c| c.id.as_str()).collect();
    check_unique_ids(&ids, "negative-example case", &path_str, &mut violations);
    Ok(Loaded { value, violations })
}

/// Loads `negative_examples.v1.json`.
pub fn load_negative_examples(path: &Path) -> Result<Loaded<NegativeExamples>, PsysError> {
    load_negative_examples_doc(path, "negative_examples")
}

/// Loads `system_negative_examples.v1.json`.
pub fn load_system_negative_examples(path: &Path) -> Result<Loaded<NegativeExamples>, PsysError> {
    load_negative_examples_doc(path, "system_negative_examples")
}

/// Loads `golden_corpus.v1.json`.
pub fn load_golden_corpus(path: &Path) -> Result<Loaded<GoldenCorpus>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("golden_corpus", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "examples"], &path_str, &mut violations);
    let value: GoldenCorpus = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("golden_corpus document malformed: {e}"), path_str))?;
    Ok(Loaded { value, violations })
}

const STRATEGY_ENTRY_KEYS: &[&str] = &[
    "strategy_id", "kind", "name", "combining", "canonical_semantics_hash_sha256", "fixtures",
];

/// Loads `strategies/strategy_registry.v1.json`. `strategy_id` emptiness/uniqueness is checked
/// here; `combining.algorithm` validity and the semantics-hash/fixture-conformance checks belong
/// to `psys-strategy`, which needs the loaded registry and the rest of the evaluation context
/// (there's nothing to check a hash or a fixture against at load time).
pub fn load_strategy_registry(path: &Path) -> Result<Loaded<StrategyRegistry>, PsysError> {
    let mut doc = load_value(path)?;
    let path_str = path.display().to_string();
    let mut violations = Vec::new();
    check_schema_id(&doc, &psys_core::schema_id("strategy_registry", 1), &path_str, &mut violations);
    promote_extensions(&mut doc, &["schema", "strategies"], &path_str, &mut violations);

    if let Some(Value::Array(items)) = doc.get_mut("strategies") {
        for item in items.iter_mut() {
            promote_extensions(item, STRATEGY_ENTRY_KEYS, &path_str, &mut violations);
        }
    }

    let value: StrategyRegistry = serde_json::from_value(doc)
        .map_err(|e| PsysError::fatal_at_path(ErrorCode::SchemaIo, format!("strategy_registry document malformed: {e}"), path_str.clone()))?;

    for entry in &value.strategies {
        if entry.strategy_id.trim().is_empty() {
            violations.push(
                Violation::new(
                    ErrorCode::StrategyRegistryMissingDocId,
                    "strategy entry has an empty strategy_id",
                    Severity::Error,
                )
                .with_context("path", &path_str),
            );
        }
    }
    let ids: Vec<&str> = value.strategies.iter().map(|s| s.strategy_id.as_str()).collect();
    check_unique_ids(&ids, "strategy", &path_str, &mut violations);

    Ok(Loaded { value, violations })
}
