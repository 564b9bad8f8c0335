// ABOUTME: Topological ordering of graph nodes using Kahn's algorithm
// ABOUTME: Deterministic FIFO tie-breaking seeded by node insertion order, with cycle reporting

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, VecDeque};

use super::error::GraphError;
use super::store::{GraphStore, NodeId};

pub struct Scheduler;

/// Ordering failed because these nodes sit on a cycle, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub nodes: Vec<NodeId>,
}

impl From<Cycle> for GraphError {
    fn from(cycle: Cycle) -> Self {
        GraphError::CycleDetected { nodes: cycle.nodes }
    }
}

impl Scheduler {
    /// Order every node so that each edge's source precedes its target.
    ///
    /// Nodes that become ready together run in the order they entered the
    /// queue, which is node insertion order for the initial seed and edge
    /// insertion order afterwards. Identical graphs always yield identical
    /// orders.
    pub fn order(store: &GraphStore) -> Result<Vec<NodeId>, Cycle> {
        let mut in_degree: HashMap<&str, usize> =
            store.node_ids().map(|id| (id.as_str(), 0)).collect();
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();

        for edge in store.edges() {
            successors
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
            if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
                *degree += 1;
            }
        }

        let mut queue: VecDeque<&str> = store
            .node_ids()
            .map(|id| id.as_str())
            .filter(|id| in_degree[id] == 0)
            .collect();
        let mut sorted = Vec::with_capacity(store.node_count());

        while let Some(node) = queue.pop_front() {
            sorted.push(node.to_string());

            for &next in successors.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if sorted.len() < store.node_count() {
            return Err(Cycle {
                nodes: Self::cyclic_nodes(store),
            });
        }

        Ok(sorted)
    }

    /// Nodes that sit on a cycle, in insertion order
    fn cyclic_nodes(store: &GraphStore) -> Vec<NodeId> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let indices: HashMap<&str, NodeIndex> = store
            .node_ids()
            .map(|id| (id.as_str(), graph.add_node(id.as_str())))
            .collect();

        for edge in store.edges() {
            graph.add_edge(
                indices[edge.source.as_str()],
                indices[edge.target.as_str()],
                (),
            );
        }

        let mut on_cycle: Vec<&str> = Vec::new();
        for component in tarjan_scc(&graph) {
            let self_loop = component.len() == 1 && graph.contains_edge(component[0], component[0]);
            if component.len() > 1 || self_loop {
                on_cycle.extend(component.iter().map(|&idx| graph[idx]));
            }
        }

        store
            .node_ids()
            .filter(|id| on_cycle.contains(&id.as_str()))
            .cloned()
            .collect()
    }
}
