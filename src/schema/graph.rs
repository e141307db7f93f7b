//! Definition Reference Graph
//!
//! Directed graph of `$ref` dependencies between the definitions of a schema
//! document, used to report reference cycles up front. A cycle made only of
//! alias edges (a definition that *is* a reference) can never resolve to a
//! concrete node; cycles through nested references are legal recursive types.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use super::Schema;

const LOCAL_PREFIX: &str = "#/definitions/";

/// How one definition refers to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EdgeKind {
    /// The definition is the reference (directly, or as the first
    /// `oneOf`/`anyOf` alternative), so resolving it follows the edge
    Alias,
    /// The reference sits inside the definition (property, items, ...)
    Nested,
}

/// Strongly connected set of definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceCycle {
    /// Sorted definition names
    pub members: Vec<String>,
    /// Every edge of the cycle is an alias; resolution always fails
    pub alias_only: bool,
}

#[derive(Debug, Default)]
pub struct ReferenceGraph {
    graph: DiGraph<String, EdgeKind>,
    indices: HashMap<String, NodeIndex>,
}

impl ReferenceGraph {
    /// Build the graph of a schema's `definitions`
    pub fn from_schema(schema: &Schema) -> Self {
        Self::from_document(schema.document())
    }

    pub fn from_document(document: &Value) -> Self {
        let mut graph = Self::default();
        let Some(definitions) = document.get("definitions").and_then(Value::as_object) else {
            return graph;
        };

        for name in definitions.keys() {
            graph.node(name);
        }
        for (name, definition) in definitions {
            let mut refs = Vec::new();
            collect_refs(definition, true, &mut refs);
            let from = graph.node(name);
            for (reference, kind) in refs {
                let to = graph.node(&target_name(&reference));
                graph.graph.add_edge(from, to, kind);
            }
        }

        tracing::debug!(
            nodes = graph.graph.node_count(),
            edges = graph.graph.edge_count(),
            "built reference graph"
        );
        graph
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Definitions (or external references) `name` refers to
    pub fn references(&self, name: &str) -> Vec<(&str, EdgeKind)> {
        let Some(&idx) = self.indices.get(name) else {
            return Vec::new();
        };
        let mut targets: Vec<(&str, EdgeKind)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| {
                self.graph
                    .node_weight(e.target())
                    .map(|t| (t.as_str(), *e.weight()))
            })
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }

    /// Every reference cycle. Alias-only cycles come first.
    pub fn cycles(&self) -> Vec<ReferenceCycle> {
        let aliases = self.graph.filter_map(
            |_, name| Some(name.clone()),
            |_, kind| (*kind == EdgeKind::Alias).then_some(*kind),
        );
        let alias_cycles = strongly_connected(&aliases);
        let all_cycles = strongly_connected(&self.graph);

        let mut cycles: Vec<ReferenceCycle> = alias_cycles
            .iter()
            .map(|members| ReferenceCycle {
                members: members.clone(),
                alias_only: true,
            })
            .collect();
        cycles.extend(
            all_cycles
                .into_iter()
                .filter(|members| !alias_cycles.contains(members))
                .map(|members| ReferenceCycle {
                    members,
                    alias_only: false,
                }),
        );
        cycles
    }
}

/// Sorted member lists of SCCs that contain a cycle
fn strongly_connected(graph: &DiGraph<String, EdgeKind>) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = kosaraju_scc(graph)
        .into_iter()
        .filter(|scc| {
            scc.len() > 1
                || graph
                    .edges_directed(scc[0], Direction::Outgoing)
                    .any(|e| e.target() == scc[0])
        })
        .map(|scc| {
            let members: BTreeSet<String> = scc
                .into_iter()
                .filter_map(|idx| graph.node_weight(idx).cloned())
                .collect();
            members.into_iter().collect()
        })
        .collect();
    groups.sort();
    groups
}

/// Node name for a reference: the definition name for local references,
/// the reference itself otherwise
fn target_name(reference: &str) -> String {
    match reference.strip_prefix(LOCAL_PREFIX) {
        Some(rest) => rest
            .split('/')
            .next()
            .unwrap_or(rest)
            .replace("~1", "/")
            .replace("~0", "~"),
        None => reference.to_string(),
    }
}

/// Collect `$ref`s of a definition. `top` marks the definition node itself.
fn collect_refs(node: &Value, top: bool, refs: &mut Vec<(String, EdgeKind)>) {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                let kind = if top { EdgeKind::Alias } else { EdgeKind::Nested };
                refs.push((reference.to_string(), kind));
            }
            for (key, value) in map {
                match (key.as_str(), value) {
                    ("oneOf" | "anyOf", Value::Array(alternatives)) => {
                        for (pos, alternative) in alternatives.iter().enumerate() {
                            collect_refs(alternative, top && pos == 0, refs);
                        }
                    }
                    _ => collect_refs(value, false, refs),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, false, refs);
            }
        }
        _ => {}
    }
}
