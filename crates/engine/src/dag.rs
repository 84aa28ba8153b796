//! `TopologicalScheduler` (C2) — pure graph theory only: Kahn's algorithm
//! with a deterministic tie-break, plus the direct-parent dependency map
//! used to route `relevantOutputs` (spec §4.2).
//!
//! Cycle/orphan/handler/terminal-category checks live in [`crate::validate`]
//! — this module only orders an already-accepted graph and is defensive
//! about cycles (`EngineError::CycleOrOrphanError`) rather than diagnostic.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{Edge, NodeDefinition};
use crate::EngineError;

/// `nodeId → [direct parent nodeIds]`, sorted for determinism.
pub type DependencyMap = HashMap<String, Vec<String>>;

/// Result of a successful sort: the execution order plus the dependency
/// map dependents use to gather `relevantOutputs`.
#[derive(Debug, Clone)]
pub struct ScheduleResult {
    pub order: Vec<String>,
    pub dependencies: DependencyMap,
}

/// Topologically sort `nodes`/`edges`.
///
/// Ties among zero-in-degree nodes are broken by ascending `nodeId`
/// (spec §4.2, property P2: "byte-identical across runs"). Using a
/// `BTreeSet` frontier instead of `HashMap` iteration order is what makes
/// this deterministic — the original inline `HashMap`-seeded queue in this
/// area of the codebase bordered indeterminate because two nodes with
/// zero in-degree could pop in either order depending on hash seed.
pub fn topological_sort(nodes: &[NodeDefinition], edges: &[Edge]) -> Result<ScheduleResult, EngineError> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependencies: DependencyMap = HashMap::new();

    for node in nodes {
        adjacency.entry(node.id.as_str()).or_default();
        in_degree.entry(node.id.as_str()).or_insert(0);
        dependencies.entry(node.id.clone()).or_default();
    }

    for edge in edges {
        adjacency.entry(edge.from.as_str()).or_default().insert(edge.to.as_str());
        *in_degree.entry(edge.to.as_str()).or_insert(0) += 1;
        dependencies.entry(edge.to.clone()).or_default().push(edge.from.clone());
    }

    for parents in dependencies.values_mut() {
        parents.sort();
    }

    let mut frontier: BTreeSet<&str> = in_degree.iter().filter(|(_, &d)| d == 0).map(|(&id, _)| id).collect();

    let mut order = Vec::with_capacity(nodes.len());

    while let Some(&node_id) = frontier.iter().next() {
        frontier.remove(node_id);
        order.push(node_id.to_string());

        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                let degree = in_degree.entry(neighbour).or_insert(0);
                *degree -= 1;
                if *degree == 0 {
                    frontier.insert(neighbour);
                }
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(EngineError::CycleOrOrphanError);
    }

    Ok(ScheduleResult { order, dependencies })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> NodeDefinition {
        NodeDefinition {
            id: id.to_string(),
            node_type: "mock".to_string(),
            data: serde_json::Value::Null,
            config: serde_json::Value::Null,
            input_schema: None,
            output_schema: None,
        }
    }

    fn edge(from: &str, to: &str) -> Edge {
        Edge { from: from.to_string(), to: to.to_string() }
    }

    #[test]
    fn p1_every_edge_respects_precedence() {
        let nodes = vec![node("c"), node("a"), node("b")];
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let result = topological_sort(&nodes, &edges).unwrap();
        let pos = |id: &str| result.order.iter().position(|n| n == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn p2_tie_break_is_ascending_node_id_and_stable_across_runs() {
        let nodes = vec![node("z"), node("y"), node("x")];
        let edges = vec![];
        let first = topological_sort(&nodes, &edges).unwrap().order;
        let second = topological_sort(&nodes, &edges).unwrap().order;
        assert_eq!(first, vec!["x", "y", "z"]);
        assert_eq!(first, second);
    }

    #[test]
    fn dependency_map_holds_only_direct_parents() {
        // a -> b -> c, a -> c (c has two direct parents: a and b)
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("a", "c")];
        let result = topological_sort(&nodes, &edges).unwrap();
        assert_eq!(result.dependencies["c"], vec!["a", "b"]);
        assert_eq!(result.dependencies["a"], Vec::<String>::new());
    }

    #[test]
    fn cycle_yields_cycle_or_orphan_error() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b"), edge("b", "a")];
        assert!(matches!(topological_sort(&nodes, &edges), Err(EngineError::CycleOrOrphanError)));
    }

    #[test]
    fn b3_single_node_no_edges_is_valid() {
        let nodes = vec![node("solo")];
        let result = topological_sort(&nodes, &[]).unwrap();
        assert_eq!(result.order, vec!["solo"]);
    }
}
