// SPDX-License-Identifier: MIT OR Apache-2.0
//! Predicate evaluation: whether a [`BondRule`]'s `when{}` clause triggers against a compound.

use psys_core::{BondRule, Compound, Table};
use psys_index::ElementIndex;
use serde::Serialize;
use std::collections::BTreeSet;

/// Record of which predicate(s) fired and what matched, for trace attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BecauseTrace {
    /// Element ids that satisfied `any_of`/`all_of`.
    pub matched_element_ids: Vec<String>,
    /// Tags that satisfied `any_tag`.
    pub matched_tags: Vec<String>,
    /// Tables that satisfied `table_any_of`, alongside the element ids that belong to them.
    pub matched_tables: Vec<Table>,
}

/// Outcome of evaluating a rule's `when{}` clause against a compound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerResult {
    /// `true` iff every present predicate held.
    pub triggered: bool,
    /// What matched, for every predicate that held.
    pub because: BecauseTrace,
}

/// Evaluates `rule.when` against `compound`. Every predicate present in `when{}` is AND-ed; an
/// absent predicate is vacuously satisfied.
#[must_use]
pub fn triggered(rule: &BondRule, compound: &Compound, index: &ElementIndex) -> TriggerResult {
    let present: BTreeSet<&str> = compound.elements.iter().map(String::as_str).collect();
    let mut because = BecauseTrace::default();
    let mut ok = true;

    if let Some(any_of) = &rule.when.any_of {
        let matched: Vec<String> = any_of
            .iter()
            .filter(|id| present.contains(id.as_str()))
            .cloned()
            .collect();
        if matched.is_empty() {
            ok = false;
        } else {
            because.matched_element_ids.extend(matched);
        }
    }

    if let Some(all_of) = &rule.when.all_of {
        if all_of.iter().all(|id| present.contains(id.as_str())) {
            because.matched_element_ids.extend(all_of.iter().cloned());
        } else {
            ok = false;
        }
    }

    if let Some(any_tag) = &rule.when.any_tag {
        let compound_tags: BTreeSet<&str> = compound
            .elements
            .iter()
            .filter_map(|id| index.get(id))
            .flat_map(|e| e.tags.iter().map(String::as_str))
            .collect();
        let matched: Vec<String> = any_tag
            .iter()
            .filter(|t| compound_tags.contains(t.as_str()))
            .cloned()
            .collect();
        if matched.is_empty() {
            ok = false;
        } else {
            because.matched_tags.extend(matched);
        }
    }

    if let Some(table_any_of) = &rule.when.table_any_of {
        let wanted: BTreeSet<Table> = table_any_of.iter().copied().collect();
        let mut hit_tables = BTreeSet::new();
        let mut hit_elements = Vec::new();
        for id in &compound.elements {
            if let Some(element) = index.get(id) {
                if wanted.contains(&element.table) {
                    hit_tables.insert(element.table);
                    hit_elements.push(id.clone());
                }
            }
        }
        if hit_tables.is_empty() {
            ok = false;
        } else {
            because.matched_tables.extend(hit_tables);
            because.matched_element_ids.extend(hit_elements);
        }
    }

    because.matched_element_ids.sort();
    because.matched_element_ids.dedup();
    because.matched_tags.sort();
    because.matched_tags.dedup();

    TriggerResult {
        triggered: ok,
        because,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psys_core::{Element, EvidenceBindingMode, RequireClause, RuleSeverity, WhenClause};
    use std::collections::BTreeMap;

    fn elem(id: &str, table: Table, tags: &[&str]) -> Element {
        Element {
            id: id.to_string(),
            table,
            group: "g".into(),
            name: "n".into(),
            summary: "s".into(),
            domain: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            required_states: Vec::new(),
            implies: Vec::new(),
            requires: Vec::new(),
            invariants: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }

    fn compound(elements: &[&str]) -> Compound {
        Compound {
            id: "comp.x".into(),
            name: "x".into(),
            tables_version: "v1".into(),
            elements: elements.iter().map(|s| s.to_string()).collect(),
            domain: None,
            invariants: Vec::new(),
            director_notes: None,
            waivers: Vec::new(),
            evidence_binding_mode: EvidenceBindingMode::ImplicitById,
            evidence_bindings: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }

    fn rule_with_when(when: WhenClause) -> BondRule {
        BondRule {
            id: "r.x".into(),
            when,
            require: RequireClause::default(),
            message: "m".into(),
            severity: RuleSeverity::Warn,
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn any_of_triggers_on_single_match() {
        let (index, _) = ElementIndex::build(vec![elem("exp.a", Table::Experience, &[])]);
        let rule = rule_with_when(WhenClause {
            any_of: Some(vec!["exp.a".into(), "exp.b".into()]),
            ..Default::default()
        });
        let result = triggered(&rule, &compound(&["exp.a"]), &index);
        assert!(result.triggered);
        assert_eq!(result.because.matched_element_ids, vec!["exp.a"]);
    }

    #[test]
    fn all_of_requires_every_element() {
        let (index, _) = ElementIndex::build(vec![elem("exp.a", Table::Experience, &[])]);
        let rule = rule_with_when(WhenClause {
            all_of: Some(vec!["exp.a".into(), "exp.b".into()]),
            ..Default::default()
        });
        let result = triggered(&rule, &compound(&["exp.a"]), &index);
        assert!(!result.triggered);
    }

    #[test]
    fn any_tag_matches_via_element_tag_union() {
        let (index, _) = ElementIndex::build(vec![elem("exp.a", Table::Experience, &["irreversible.x"])]);
        let rule = rule_with_when(WhenClause {
            any_tag: Some(vec!["irreversible.x".into()]),
            ..Default::default()
        });
        let result = triggered(&rule, &compound(&["exp.a"]), &index);
        assert!(result.triggered);
        assert_eq!(result.because.matched_tags, vec!["irreversible.x"]);
    }

    #[test]
    fn table_any_of_matches_membership() {
        let (index, _) = ElementIndex::build(vec![elem("evi.b", Table::Evidence, &[])]);
        let rule = rule_with_when(WhenClause {
            table_any_of: Some(vec![Table::Evidence]),
            ..Default::default()
        });
        let result = triggered(&rule, &compound(&["evi.b"]), &index);
        assert!(result.triggered);
        assert_eq!(result.because.matched_tables, vec![Table::Evidence]);
    }

    #[test]
    fn predicates_are_and_ed_together() {
        let (index, _) = ElementIndex::build(vec![elem("exp.a", Table::Experience, &[])]);
        let rule = rule_with_when(WhenClause {
            any_of: Some(vec!["exp.a".into()]),
            any_tag: Some(vec!["missing_tag".into()]),
            ..Default::default()
        });
        let result = triggered(&rule, &compound(&["exp.a"]), &index);
        assert!(!result.triggered);
    }
}
