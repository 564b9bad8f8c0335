// ABOUTME: Graph store holding node and edge definitions plus per-node last output
// ABOUTME: Enforces unique node identities and existing endpoints at insertion time

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::error::{GraphError, Result};

/// Node identity. Adapters receiving numeric ids convert them to their decimal form.
pub type NodeId = String;

/// Store shared between the engine and the output capture of a running node
pub type SharedStore = Arc<RwLock<GraphStore>>;

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub command: Option<String>,
    pub timeout: Option<Duration>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub command: Option<String>,
}

/// External view of the graph: node id/command list and edge list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStructure {
    pub nodes: Vec<NodeInfo>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: IndexMap<NodeId, Node>,
    edges: Vec<Edge>,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: NodeId, command: Option<String>) -> Result<()> {
        self.insert_node(id, command, None)
    }

    pub fn add_node_with_timeout(
        &mut self,
        id: NodeId,
        command: Option<String>,
        timeout: Duration,
    ) -> Result<()> {
        self.insert_node(id, command, Some(timeout))
    }

    fn insert_node(
        &mut self,
        id: NodeId,
        command: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode { node_id: id });
        }

        self.nodes.insert(
            id.clone(),
            Node {
                id,
                command,
                timeout,
                output: None,
            },
        );
        Ok(())
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId) -> Result<()> {
        for endpoint in [&source, &target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::UnknownNode {
                    node_id: endpoint.clone(),
                });
            }
        }

        self.edges.push(Edge { source, target });
        Ok(())
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn output(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|node| node.output.as_deref())
    }

    /// Replace a node's output. Unknown ids are ignored.
    pub fn set_output(&mut self, id: &str, output: String) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.output = Some(output);
        }
    }

    /// Concatenated output of every direct predecessor, in edge insertion order.
    /// Predecessors that have not produced output yet contribute nothing.
    pub fn input_for(&self, id: &str) -> String {
        self.edges
            .iter()
            .filter(|edge| edge.target == id)
            .filter_map(|edge| self.output(&edge.source))
            .collect()
    }

    pub fn structure(&self) -> GraphStructure {
        GraphStructure {
            nodes: self
                .nodes
                .values()
                .map(|node| NodeInfo {
                    id: node.id.clone(),
                    command: node.command.clone(),
                })
                .collect(),
            edges: self.edges.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(ids: &[&str]) -> GraphStore {
        let mut store = GraphStore::new();
        for id in ids {
            store
                .add_node(id.to_string(), Some(format!("echo {}", id)))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut store = store_with(&["a"]);
        let result = store.add_node("a".to_string(), Some("cat".to_string()));

        assert_eq!(
            result,
            Err(GraphError::DuplicateNode {
                node_id: "a".to_string()
            })
        );
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.node("a").unwrap().command.as_deref(), Some("echo a"));
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut store = store_with(&["a"]);

        let result = store.add_edge("a".to_string(), "missing".to_string());
        assert_eq!(
            result,
            Err(GraphError::UnknownNode {
                node_id: "missing".to_string()
            })
        );

        let result = store.add_edge("ghost".to_string(), "a".to_string());
        assert!(matches!(result, Err(GraphError::UnknownNode { node_id }) if node_id == "ghost"));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_edges_are_kept() {
        let mut store = store_with(&["a", "b"]);
        store.add_edge("a".to_string(), "b".to_string()).unwrap();
        store.add_edge("a".to_string(), "b".to_string()).unwrap();

        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn test_input_concatenates_in_edge_order() {
        let mut store = store_with(&["a", "b", "c"]);
        store.add_edge("b".to_string(), "c".to_string()).unwrap();
        store.add_edge("a".to_string(), "c".to_string()).unwrap();

        store.set_output("a", "from a\n".to_string());
        assert_eq!(store.input_for("c"), "from a\n");

        store.set_output("b", "from b\n".to_string());
        assert_eq!(store.input_for("c"), "from b\nfrom a\n");
        assert_eq!(store.input_for("a"), "");
    }

    #[test]
    fn test_structure_preserves_insertion_order() {
        let mut store = store_with(&["z", "a", "m"]);
        store.add_edge("z".to_string(), "m".to_string()).unwrap();

        let structure = store.structure();
        let ids: Vec<&str> = structure.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
        assert_eq!(structure.edges, vec![Edge::new("z", "m")]);
    }
}
