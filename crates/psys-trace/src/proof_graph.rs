// SPDX-License-Identifier: MIT OR Apache-2.0
//! Proof graph v1 (§4.13): a deterministic DAG of rule/obligation/evidence satisfaction derived
//! from the v6.1/v6.2 trace views.

use std::collections::{BTreeMap, BTreeSet};

use psys_error::PsysError;
use serde::Serialize;
use serde_json::{json, Value};

use crate::entry::TraceEntry;

/// Node type, per §4.13's closed set. `Artifact`/`MembraneEdge`/`Context`/`Meaning`/`Strategy`
/// never appear from this crate's own builder (this evaluator tracks no cross-context/artifact
/// provenance yet) but are part of the type so a richer builder can emit them without widening
/// the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A bond rule.
    Rule,
    /// An unmet obligation.
    Obligation,
    /// An evidence-table element an obligation required.
    Evidence,
    /// A satisfaction of one evidence id by a compound element.
    SatisfiedBy,
    /// An external artifact a satisfaction mapping is bound to.
    Artifact,
    /// A membrane crossing point.
    MembraneEdge,
    /// An evaluation context.
    Context,
    /// A SPEL meaning-preservation boundary.
    Meaning,
    /// A tie-break or combining strategy.
    Strategy,
}

/// Edge relation, per §4.13's closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRel {
    /// Rule requires an obligation.
    Requires,
    /// Obligation requires an evidence id.
    RequiresEvidence,
    /// Evidence id is satisfied by a compound element.
    SatisfiedBy,
    /// A node was derived from another.
    DerivedFrom,
    /// A satisfaction is bound to a verified artifact.
    SatisfiedByArtifact,
    /// A rule was applied at a context.
    AppliedAt,
    /// A node carries a context.
    HasContext,
    /// A generic dependency.
    DependsOn,
}

/// One node.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node {
    /// Stable node id.
    pub id: String,
    /// Node type.
    pub kind: NodeKind,
}

/// One edge.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    /// Source node id.
    pub from: String,
    /// Relation.
    pub rel: EdgeRel,
    /// Target node id.
    pub to: String,
    /// Opaque metadata, canonicalized for dedup/sort purposes.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

/// The proof graph plus the hashes it binds to the trace and safety envelope it was derived from.
#[derive(Debug, Clone, Serialize)]
pub struct ProofGraph {
    /// Nodes, sorted by id.
    pub nodes: Vec<Node>,
    /// Edges, sorted by `(from, rel, to, meta)`.
    pub edges: Vec<Edge>,
    /// Digests binding this graph to the views it was derived from.
    pub meta: ProofGraphMeta,
}

/// Binding digests recorded alongside the graph.
#[derive(Debug, Clone, Serialize)]
pub struct ProofGraphMeta {
    /// Hash of the v6.1 trace view this graph was derived from.
    pub v6_1_hash_sha256: String,
    /// Hash of the v6.2 trace view this graph was derived from.
    pub v6_2_hash_sha256: String,
    /// Hash of the safety envelope this graph was derived alongside.
    pub safety_envelope_hash_sha256: String,
}

/// Graph plus its own stable hash.
#[derive(Debug, Clone)]
pub struct HashedGraph {
    /// The graph.
    pub graph: ProofGraph,
    /// `sha256_hex(stable_stringify(graph) + "\n")`.
    pub hash_sha256: String,
}

/// Builds the proof graph for one set of canonically-sorted trace entries.
///
/// # Errors
///
/// Propagates [`psys_core::stable_stringify`]'s error.
pub fn build(
    entries: &[TraceEntry],
    v6_1_hash_sha256: impl Into<String>,
    v6_2_hash_sha256: impl Into<String>,
    safety_envelope_hash_sha256: impl Into<String>,
) -> Result<HashedGraph, PsysError> {
    let mut nodes: BTreeMap<String, NodeKind> = BTreeMap::new();
    let mut edges: BTreeSet<(String, EdgeRel, String, String)> = BTreeSet::new();
    let mut touched: BTreeSet<String> = BTreeSet::new();

    for entry in entries {
        let rule_node = format!("rule:{}", entry.rule_id);
        nodes.insert(rule_node.clone(), NodeKind::Rule);

        if entry.atom.as_ref().and_then(|a| a.get("kind")).and_then(Value::as_str) == Some("obligation_miss") {
            let obligation_node = format!("obligation:{}", entry.rule_id);
            nodes.insert(obligation_node.clone(), NodeKind::Obligation);
            add_edge(&mut edges, &mut touched, &rule_node, EdgeRel::Requires, &obligation_node, Value::Null);

            for evidence_id in entry.evidence.iter().flatten() {
                let evidence_node = format!("evidence:{evidence_id}");
                nodes.insert(evidence_node.clone(), NodeKind::Evidence);
                add_edge(
                    &mut edges,
                    &mut touched,
                    &obligation_node,
                    EdgeRel::RequiresEvidence,
                    &evidence_node,
                    Value::Null,
                );

                let satisfied = entry
                    .evidence_satisfied_by
                    .as_ref()
                    .and_then(|m| m.get(evidence_id))
                    .is_some_and(|v| !v.is_empty());
                if satisfied {
                    let satisfied_by_node = format!("satisfied_by:{evidence_id}");
                    nodes.insert(satisfied_by_node.clone(), NodeKind::SatisfiedBy);
                    add_edge(
                        &mut edges,
                        &mut touched,
                        &evidence_node,
                        EdgeRel::SatisfiedBy,
                        &satisfied_by_node,
                        Value::Null,
                    );
                }
            }
        }
    }

    // Minimality: a node not touched by any edge is dropped (rule/context nodes have no other
    // reason to exist standing alone).
    let nodes: Vec<Node> = nodes
        .into_iter()
        .filter(|(id, _)| touched.contains(id))
        .map(|(id, kind)| Node { id, kind })
        .collect();

    let edges: Vec<Edge> = edges
        .into_iter()
        .map(|(from, rel, to, meta)| Edge {
            from,
            rel,
            to,
            meta: serde_json::from_str(&meta).unwrap_or(Value::Null),
        })
        .collect();

    let graph = ProofGraph {
        nodes,
        edges,
        meta: ProofGraphMeta {
            v6_1_hash_sha256: v6_1_hash_sha256.into(),
            v6_2_hash_sha256: v6_2_hash_sha256.into(),
            safety_envelope_hash_sha256: safety_envelope_hash_sha256.into(),
        },
    };
    let hash_sha256 = psys_core::hash_artifact(&graph)?;
    Ok(HashedGraph { graph, hash_sha256 })
}

fn add_edge(
    edges: &mut BTreeSet<(String, EdgeRel, String, String)>,
    touched: &mut BTreeSet<String>,
    from: &str,
    rel: EdgeRel,
    to: &str,
    meta: Value,
) {
    touched.insert(from.to_string());
    touched.insert(to.to_string());
    let meta_text = psys_core::stable_stringify_value(&meta);
    edges.insert((from.to_string(), rel, to.to_string(), meta_text));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ElementRef, EntryKind};
    use psys_error::Severity;

    fn entry_with_evidence(rule_id: &str, evidence_id: &str, satisfied: bool) -> TraceEntry {
        let satisfiers = if satisfied {
            vec![ElementRef { kind: "compound_element", element_id: evidence_id.into() }]
        } else {
            Vec::new()
        };
        TraceEntry {
            profile: "ship".into(),
            policy_uri: "policy://ship".into(),
            kind: EntryKind::Compound,
            compound_id: Some("comp.x".into()),
            rule_id: rule_id.into(),
            severity: Severity::Error,
            message: "m".into(),
            because: None,
            atom: Some(json!({"kind": "obligation_miss"})),
            requires: None,
            remediation: None,
            obligations: None,
            evidence: Some(vec![evidence_id.into()]),
            evidence_satisfied_by: Some([(evidence_id.to_string(), satisfiers)].into_iter().collect()),
            source_pack: "base".into(),
            waived: false,
            waiver_scars: None,
        }
    }

    #[test]
    fn satisfied_evidence_produces_a_satisfied_by_node() {
        let g = build(&[entry_with_evidence("r.a", "evi.b", true)], "v61", "v62", "env").unwrap();
        assert!(g.graph.nodes.iter().any(|n| n.id == "satisfied_by:evi.b"));
        assert!(g
            .graph
            .edges
            .iter()
            .any(|e| e.from == "evidence:evi.b" && matches!(e.rel, EdgeRel::SatisfiedBy)));
    }

    #[test]
    fn missing_evidence_produces_no_satisfied_by_node() {
        let g = build(&[entry_with_evidence("r.a", "evi.b", false)], "v61", "v62", "env").unwrap();
        assert!(!g.graph.nodes.iter().any(|n| matches!(n.kind, NodeKind::SatisfiedBy)));
    }

    #[test]
    fn nodes_are_sorted_by_id() {
        let g = build(
            &[entry_with_evidence("r.b", "evi.z", true), entry_with_evidence("r.a", "evi.a", true)],
            "v61",
            "v62",
            "env",
        )
        .unwrap();
        let ids: Vec<&str> = g.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn hash_is_deterministic() {
        let a = build(&[entry_with_evidence("r.a", "evi.b", true)], "v61", "v62", "env").unwrap();
        let b = build(&[entry_with_evidence("r.a", "evi.b", true)], "v61", "v62", "env").unwrap();
        assert_eq!(a.hash_sha256, b.hash_sha256);
    }
}
