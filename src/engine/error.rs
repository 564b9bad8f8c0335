// ABOUTME: Error types for graph engine operations
// ABOUTME: Structural errors reported synchronously to callers of mutating or triggering calls

use thiserror::Error;

use super::store::NodeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node ID {node_id} already exists.")]
    DuplicateNode { node_id: NodeId },

    #[error("Both source and target nodes must exist (unknown node: {node_id}).")]
    UnknownNode { node_id: NodeId },

    #[error("Cycle detected in graph involving nodes: {nodes:?}")]
    CycleDetected { nodes: Vec<NodeId> },
}

pub type Result<T> = std::result::Result<T, GraphError>;
