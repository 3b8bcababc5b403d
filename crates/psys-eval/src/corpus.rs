// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading phase: resolves the index document's relative paths and loads every other document
//! type through `psys-loader`, collecting every non-fatal violation along the way.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use psys_core::{BondPack, BondRule, Compound, DomainRegistry, Element, Profile, SpelSemantics};
use psys_error::{ErrorCode, PsysError, Violation};
use psys_loader::documents::{
    AtomicProperties, CoreTags, DomainCompletion, FlowWorkshopPairs, GoldenCorpus, Index,
    NegativeExamples, StrategyRegistry, TableMetadata,
};
use psys_loader::loader;

use crate::context::EvaluationContext;

/// Every document the loader produced for one run, plus the violations collected while loading
/// them. Held by value; every downstream stage borrows from this, never mutates it.
pub struct LoadedCorpus {
    /// The top-level index document.
    pub index: Index,
    /// Directory every path in `index` is relative to.
    pub index_dir: PathBuf,
    /// Every element across all five tables.
    pub elements: Vec<Element>,
    /// Base bond rules, always in force.
    pub base_rules: Vec<BondRule>,
    /// Declared packs.
    pub packs: Vec<BondPack>,
    /// Each pack's own rule file, keyed by pack id.
    pub pack_rules: BTreeMap<String, Vec<BondRule>>,
    /// Domain registry.
    pub domains: DomainRegistry,
    /// Selected profile.
    pub profile: Profile,
    /// Closed tag vocabulary.
    pub core_tags: CoreTags,
    /// Table metadata.
    pub table_metadata: TableMetadata,
    /// Opaque atomic-properties payload.
    pub atomic_properties: AtomicProperties,
    /// SPEL semantics.
    pub spel_semantics: SpelSemantics,
    /// Domain-completion quorum declarations.
    pub domain_completion: DomainCompletion,
    /// Flow/workshop pairing rules.
    pub flow_workshop_pairs: FlowWorkshopPairs,
    /// Golden (positive) example corpus.
    pub golden_corpus: GoldenCorpus,
    /// Compound-targeted negative examples.
    pub negative_examples: NegativeExamples,
    /// System-targeted negative examples.
    pub system_negative_examples: NegativeExamples,
    /// Combining-strategy conformance registry.
    pub strategy_registry: StrategyRegistry,
    /// Paths to every `system.*.json` document under the systems directory, excluding
    /// `system.neg_*` fixtures, sorted.
    pub system_paths: Vec<PathBuf>,
    /// Violations collected while loading (schema, closed-key, sortedness, uniqueness).
    pub violations: Vec<Violation>,
}

impl LoadedCorpus {
    /// Resolves `rel` (as found in a loaded document) against this corpus's root directory.
    #[must_use]
    pub fn resolve(&self, rel: &str) -> PathBuf {
        self.index_dir.join(rel)
    }

    /// Maps every rule id to the pack id that declares it (`"base"` for base rules), for trace
    /// attribution. Assumes rule ids are globally unique, which `PackComposer::validate_packs`
    /// enforces.
    #[must_use]
    pub fn rule_source_packs(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for rule in &self.base_rules {
            map.insert(rule.id.clone(), "base".to_string());
        }
        for (pack_id, rules) in &self.pack_rules {
            for rule in rules {
                map.insert(rule.id.clone(), pack_id.clone());
            }
        }
        map
    }
}

/// Loads the full corpus named by `index_path`, per `ctx.profile_name`.
///
/// # Errors
///
/// Returns the first fatal [`PsysError`] raised by any `load_*` call (file I/O or JSON parse
/// failure, or no profile matching the requested/default name) — per the Loader's propagation
/// policy, these abort the run rather than being collected.
pub fn load_corpus(ctx: &EvaluationContext, index_path: &Path) -> Result<LoadedCorpus, PsysError> {
    let index_dir = index_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut violations = Vec::new();

    let loaded_index = loader::load_index(index_path)?;
    let index = loaded_index.value;
    violations.extend(loaded_index.violations);

    let mut elements = Vec::new();
    for (table_name, rel_path) in &index.tables {
        let loaded = loader::load_table(&index_dir.join(rel_path), table_name)?;
        violations.extend(loaded.violations);
        elements.extend(loaded.value);
    }

    let loaded_rules = loader::load_rules(&index_dir.join(&index.bond_rules))?;
    let base_rules = loaded_rules.value;
    violations.extend(loaded_rules.violations);

    let loaded_packs = loader::load_packs(&index_dir.join(&index.bond_packs))?;
    let packs = loaded_packs.value;
    violations.extend(loaded_packs.violations);

    let mut pack_rules = BTreeMap::new();
    for pack in &packs {
        let loaded = loader::load_rules(&index_dir.join(&pack.path))?;
        violations.extend(loaded.violations);
        pack_rules.insert(pack.id.clone(), loaded.value);
    }

    let loaded_domains = loader::load_domains(&index_dir.join(&index.domains))?;
    let domains = loaded_domains.value;
    violations.extend(loaded_domains.violations);

    let loaded_profile =
        loader::load_profiles(&index_dir.join(&index.profiles), ctx.profile_name.as_deref())?;
    let profile = loaded_profile.value;
    violations.extend(loaded_profile.violations);

    let loaded_core_tags = loader::load_core_tags(&index_dir.join(&index.core_tags))?;
    let core_tags = loaded_core_tags.value;
    violations.extend(loaded_core_tags.violations);

    let loaded_table_metadata =
        loader::load_table_metadata(&index_dir.join(&index.table_metadata))?;
    let table_metadata = loaded_table_metadata.value;
    violations.extend(loaded_table_metadata.violations);

    let loaded_atomic_properties =
        loader::load_atomic_properties(&index_dir.join(&index.atomic_properties))?;
    let atomic_properties = loaded_atomic_properties.value;
    violations.extend(loaded_atomic_properties.violations);

    let loaded_spel_semantics =
        loader::load_spel_semantics(&index_dir.join(&index.spel_semantics))?;
    let spel_semantics = loaded_spel_semantics.value;
    violations.extend(loaded_spel_semantics.violations);

    let loaded_domain_completion =
        loader::load_domain_completion(&index_dir.join(&index.domain_completion))?;
    let domain_completion = loaded_domain_completion.value;
    violations.extend(loaded_domain_completion.violations);

    let loaded_pairs =
        loader::load_flow_workshop_pairs(&index_dir.join(&index.flow_workshop_pairs))?;
    let flow_workshop_pairs = loaded_pairs.value;
    violations.extend(loaded_pairs.violations);

    let loaded_golden = loader::load_golden_corpus(&index_dir.join(&index.examples))?;
    let golden_corpus = loaded_golden.value;
    violations.extend(loaded_golden.violations);

    let loaded_negative = loader::load_negative_examples(&index_dir.join(&index.negative_examples))?;
    let negative_examples = loaded_negative.value;
    violations.extend(loaded_negative.violations);

    let loaded_system_negative = loader::load_system_negative_examples(
        &index_dir.join(&index.system_negative_examples),
    )?;
    let system_negative_examples = loaded_system_negative.value;
    violations.extend(loaded_system_negative.violations);

    let loaded_strategies = loader::load_strategy_registry(&index_dir.join(&index.strategies))?;
    let strategy_registry = loaded_strategies.value;
    violations.extend(loaded_strategies.violations);

    let systems_dir = index_dir.join(&index.systems);
    let system_paths = discover_system_paths(&systems_dir)?;

    Ok(LoadedCorpus {
        index,
        index_dir,
        elements,
        base_rules,
        packs,
        pack_rules,
        domains,
        profile,
        core_tags,
        table_metadata,
        atomic_properties,
        spel_semantics,
        domain_completion,
        flow_workshop_pairs,
        golden_corpus,
        negative_examples,
        system_negative_examples,
        strategy_registry,
        system_paths,
        violations,
    })
}

/// Lists `system.*.json` files directly inside `dir`, excluding negative-example fixtures
/// (`system.neg_*.json`), sorted by filename so run order never affects downstream hashes.
fn discover_system_paths(dir: &Path) -> Result<Vec<PathBuf>, PsysError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        PsysError::fatal_at_path(
            ErrorCode::SchemaIo,
            format!("cannot list systems directory: {e}"),
            dir.display().to_string(),
        )
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            PsysError::fatal_at_path(
                ErrorCode::SchemaIo,
                format!("cannot read systems directory entry: {e}"),
                dir.display().to_string(),
            )
        })?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with("system.") || !name.ends_with(".json") || name.starts_with("system.neg_") {
            continue;
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}
