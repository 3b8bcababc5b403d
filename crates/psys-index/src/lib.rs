// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-index
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! A compiled `element_id -> Element` map with domain/table/tag accessors and strict/non-strict
//! reference validation, built once from every loaded element table.

use psys_core::{Element, Table};
use psys_error::{ErrorCode, Severity, Violation};
use std::collections::BTreeMap;

/// Compiled lookup map over every element across all five tables.
#[derive(Debug, Default)]
pub struct ElementIndex {
    elements: BTreeMap<String, Element>,
}

impl ElementIndex {
    /// Builds an index from every table's elements, rejecting ids that repeat across tables.
    /// Non-fatal: duplicates are reported as violations but the first occurrence wins in the
    /// returned index.
    pub fn build(all_elements: impl IntoIterator<Item = Element>) -> (Self, Vec<Violation>) {
        let mut elements = BTreeMap::new();
        let mut violations = Vec::new();
        for element in all_elements {
            if elements.contains_key(&element.id) {
                violations.push(
                    Violation::new(
                        ErrorCode::IdDuplicate,
                        format!("element id {:?} appears in more than one table", element.id),
                        Severity::Error,
                    )
                    .with_context("id", &element.id),
                );
                continue;
            }
            if element.irreversible_tag_count() > 1 {
                violations.push(
                    Violation::new(
                        ErrorCode::SchemaMissingField,
                        format!("element {:?} carries more than one irreversible.* tag", element.id),
                        Severity::Error,
                    )
                    .with_context("id", &element.id),
                );
            }
            elements.insert(element.id.clone(), element);
        }
        (Self { elements }, violations)
    }

    /// Looks up an element by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    /// `true` if `id` resolves in this index.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Iterates every element belonging to `table`.
    pub fn by_table(&self, table: Table) -> impl Iterator<Item = &Element> {
        self.elements.values().filter(move |e| e.table == table)
    }

    /// Iterates every element carrying `tag`.
    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements.values().filter(move |e| e.tags.contains(tag))
    }

    /// Iterates every loaded element.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Number of loaded elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// `true` if no elements were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Validates that `id` resolves; under `strict`, an unresolved id is an error, otherwise a
    /// warning. Returns `None` if `id` resolves.
    #[must_use]
    pub fn validate_element_ref(&self, id: &str, strict: bool, context_label: &str) -> Option<Violation> {
        if self.contains(id) {
            return None;
        }
        let severity = if strict { Severity::Error } else { Severity::Warn };
        Some(
            Violation::new(
                ErrorCode::ReferenceUnknownElement,
                format!("{context_label} references unknown element {id:?}"),
                severity,
            )
            .with_context("id", id),
        )
    }

    /// Validates that `tag` is carried by at least one element; under `strict`, an unused tag is
    /// an error, otherwise a warning.
    #[must_use]
    pub fn validate_tag_ref(&self, tag: &str, strict: bool, context_label: &str) -> Option<Violation> {
        if self.by_tag(tag).next().is_some() {
            return None;
        }
        let severity = if strict { Severity::Error } else { Severity::Warn };
        Some(
            Violation::new(
                ErrorCode::ReferenceUnknownTag,
                format!("{context_label} references unknown tag {tag:?}"),
                severity,
            )
            .with_context("tag", tag),
        )
    }

    /// Parses a table name string, producing a violation if it is not one of the five known
    /// tables.
    pub fn parse_table_name(name: &str, context_label: &str) -> Result<Table, Violation> {
        match name {
            "experience" => Ok(Table::Experience),
            "workshop" => Ok(Table::Workshop),
            "capability" => Ok(Table::Capability),
            "evidence" => Ok(Table::Evidence),
            "principle" => Ok(Table::Principle),
            other => Err(
                Violation::new(
                    ErrorCode::ReferenceUnknownTable,
                    format!("{context_label} references unknown table {other:?}"),
                    Severity::Error,
                )
                .with_context("table", other),
            ),
        }
    }

    /// Per-element domain-declaration check (§4.3): in strict mode, every element must declare a
    /// `domain`; otherwise missing domain is a warning.
    pub fn validate_domain_declarations(&self, strict: bool) -> Vec<Violation> {
        self.elements
            .values()
            .filter(|e| e.domain.is_none())
            .map(|e| {
                let severity = if strict { Severity::Error } else { Severity::Warn };
                Violation::new(
                    ErrorCode::ReferenceUnknownDomain,
                    format!("element {:?} does not declare a domain", e.id),
                    severity,
                )
                .with_context("id", &e.id)
            })
            .collect()
    }

    /// Validates every element's `implies`/`requires`/`invariants` references resolve in this
    /// index.
    pub fn validate_element_cross_references(&self, strict: bool) -> Vec<Violation> {
        let mut out = Vec::new();
        for element in self.elements.values() {
            for referenced in element.referenced_ids() {
                if let Some(v) = self.validate_element_ref(
                    referenced,
                    strict,
                    &format!("element {:?}", element.id),
                ) {
                    out.push(v);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psys_core::Element;
    use std::collections::{BTreeMap, BTreeSet};

    fn elem(id: &str, table: Table) -> Element {
        Element {
            id: id.to_string(),
            table,
            group: "g".into(),
            name: "n".into(),
            summary: "s".into(),
            domain: None,
            tags: BTreeSet::new(),
            required_states: Vec::new(),
            implies: Vec::new(),
            requires: Vec::new(),
            invariants: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn build_rejects_duplicate_ids_across_tables() {
        let (index, violations) = ElementIndex::build(vec![
            elem("exp.a", Table::Experience),
            elem("exp.a", Table::Workshop),
        ]);
        assert_eq!(index.len(), 1);
        assert!(violations.iter().any(|v| v.code == ErrorCode::IdDuplicate));
    }

    #[test]
    fn validate_element_ref_is_warning_when_not_strict() {
        let (index, _) = ElementIndex::build(vec![]);
        let v = index.validate_element_ref("missing", false, "rule r.x").unwrap();
        assert_eq!(v.severity, Severity::Warn);
    }

    #[test]
    fn validate_element_ref_is_error_when_strict() {
        let (index, _) = ElementIndex::build(vec![]);
        let v = index.validate_element_ref("missing", true, "rule r.x").unwrap();
        assert_eq!(v.severity, Severity::Error);
    }

    #[test]
    fn missing_domain_is_error_only_in_strict_mode() {
        let (index, _) = ElementIndex::build(vec![elem("exp.a", Table::Experience)]);
        let warn = index.validate_domain_declarations(false);
        let err = index.validate_domain_declarations(true);
        assert_eq!(warn[0].severity, Severity::Warn);
        assert_eq!(err[0].severity, Severity::Error);
    }

    #[test]
    fn parse_table_name_rejects_unknown_table() {
        assert!(ElementIndex::parse_table_name("nonsense", "ctx").is_err());
        assert!(ElementIndex::parse_table_name("workshop", "ctx").is_ok());
    }
}
