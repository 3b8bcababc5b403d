// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-loader
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Schema-validated loading of every Periodic System document type. Every `load_*` function
//! returns a best-effort value plus the non-fatal violations collected while loading it; only
//! file I/O and JSON parse failures abort with a fatal [`psys_error::PsysError`].

/// Document types with no dedicated home in `psys_core::model`.
pub mod documents;
/// One `load_*` function per document type.
pub mod loader;
/// Closed-key enforcement, sortedness, and uniqueness helpers shared by every loader.
pub mod schema;

pub use documents::{
    AtomicProperties, Combining, CoreTags, DomainCompletion, DomainCompletionEntry,
    FlowWorkshopPair, FlowWorkshopPairs, GoldenCorpus, GoldenExample, Index, LinkEffect,
    NegativeExampleCase, NegativeExamples, StrategyEntry, StrategyFixture, StrategyRegistry,
    TableMeta, TableMetadata,
};
pub use loader::{
    Loaded, load_atomic_properties, load_compound, load_core_tags, load_domain_completion,
    load_domains, load_flow_workshop_pairs, load_golden_corpus, load_index,
    load_negative_examples, load_packs, load_profiles, load_rules, load_spel_semantics,
    load_strategy_registry, load_system, load_system_negative_examples, load_table,
    load_table_metadata,
};
