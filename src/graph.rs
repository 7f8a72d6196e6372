//! Reference Graph
//!
//! Definition -> definition edges for every reference the builder will
//! expand. The builder itself only recognizes direct self-references, so
//! this pass exists to name indirect cycles (strongly connected components
//! with more than one member) before compilation runs into its depth limit.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::node::{Definitions, SchemaNode};
use crate::reference::{collect_pointers, parse_pointer};

/// Reference edge that does not lead to a known definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRef {
    /// Definition containing the pointer
    pub from: String,
    pub pointer: String,
}

/// Directed graph of references between definitions
#[derive(Debug)]
pub struct ReferenceGraph {
    graph: DiGraph<String, ()>,
    node_indices: BTreeMap<String, NodeIndex>,
    self_references: BTreeSet<String>,
    dangling: Vec<DanglingRef>,
}

impl ReferenceGraph {
    /// Build the graph for a definitions map
    pub fn from_definitions(definitions: &Definitions, extension_key: &str) -> Self {
        let mut graph = DiGraph::with_capacity(definitions.len(), definitions.len() * 2);
        let node_indices: BTreeMap<String, NodeIndex> = definitions
            .keys()
            .map(|name| (name.clone(), graph.add_node(name.clone())))
            .collect();

        let mut self_references = BTreeSet::new();
        let mut dangling = Vec::new();

        for (name, raw) in definitions {
            let node = SchemaNode::parse(raw, extension_key);
            let mut pointers = Vec::new();
            collect_pointers(&node, &mut pointers);

            let from_idx = node_indices[name];
            let mut targets = BTreeSet::new();
            for pointer in pointers {
                let target = parse_pointer(pointer).filter(|t| node_indices.contains_key(*t));
                match target {
                    Some(target) if target == name.as_str() => {
                        self_references.insert(name.clone());
                    }
                    Some(target) => {
                        targets.insert(target);
                    }
                    None => dangling.push(DanglingRef {
                        from: name.clone(),
                        pointer: pointer.to_string(),
                    }),
                }
            }

            for target in targets {
                graph.add_edge(from_idx, node_indices[target], ());
            }
        }

        Self {
            graph,
            node_indices,
            self_references,
            dangling,
        }
    }

    /// Cycles through two or more definitions, each sorted by name
    pub fn indirect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut names: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Definitions that reference themselves directly
    pub fn self_referencing(&self) -> impl Iterator<Item = &str> {
        self.self_references.iter().map(String::as_str)
    }

    /// Definitions `name` expands (excluding itself), sorted
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<&str> = self
            .graph
            .neighbors(idx)
            .filter_map(|n| self.graph.node_weight(n).map(String::as_str))
            .collect();
        deps.sort();
        deps
    }

    /// Pointers that are malformed or name a missing definition
    pub fn dangling(&self) -> &[DanglingRef] {
        &self.dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph(value: serde_json::Value) -> ReferenceGraph {
        let definitions: Definitions = serde_json::from_value(value).unwrap();
        ReferenceGraph::from_definitions(&definitions, "x-swaggering-mongoose")
    }

    #[test]
    fn test_self_reference_is_not_an_indirect_cycle() {
        let g = graph(json!({
            "Human": {"properties": {"father": {"$ref": "#/definitions/Human"}}}
        }));
        assert!(g.indirect_cycles().is_empty());
        assert_eq!(g.self_referencing().collect::<Vec<_>>(), vec!["Human"]);
    }

    #[test]
    fn test_indirect_cycle_detected() {
        let g = graph(json!({
            "A": {"properties": {"b": {"$ref": "#/definitions/B"}}},
            "B": {"properties": {"c": {"type": "array", "items": {"$ref": "#/definitions/C"}}}},
            "C": {"properties": {"a": {"$ref": "#/components/schemas/A"}}},
            "D": {"properties": {"a": {"$ref": "#/definitions/A"}}}
        }));
        assert_eq!(
            g.indirect_cycles(),
            vec![vec!["A".to_string(), "B".to_string(), "C".to_string()]]
        );
        assert_eq!(g.dependencies("D"), vec!["A"]);
    }

    #[test]
    fn test_by_id_links_break_cycles() {
        let g = graph(json!({
            "Person": {"properties": {"cars": {
                "type": "array",
                "items": {"$ref": "#/definitions/Car", "x-swaggering-mongoose": {"type": "ObjectId"}}
            }}},
            "Car": {"properties": {"owner": {"$ref": "#/definitions/Person"}}}
        }));
        assert!(g.indirect_cycles().is_empty());
        assert_eq!(g.dependencies("Car"), vec!["Person"]);
        assert!(g.dependencies("Person").is_empty());
    }

    #[test]
    fn test_dangling_pointers() {
        let g = graph(json!({
            "Pet": {"properties": {
                "owner": {"$ref": "#/definitions/Owner"},
                "tag": {"$ref": "tags.json#/Tag"}
            }}
        }));
        let dangling: Vec<&str> = g.dangling().iter().map(|d| d.pointer.as_str()).collect();
        assert_eq!(dangling, vec!["#/definitions/Owner", "tags.json#/Tag"]);
    }
}
