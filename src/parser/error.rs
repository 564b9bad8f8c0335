// ABOUTME: Error types for graph definition parsing and validation
// ABOUTME: Defines specific error types for parser module operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read graph file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Empty graph: no nodes defined")]
    EmptyGraph,

    #[error("Duplicate node id: {node}")]
    DuplicateNode { node: String },

    #[error("Edge {source_id} -> {target_id} references unknown node '{node}'")]
    UnknownNode {
        source_id: String,
        target_id: String,
        node: String,
    },

    #[error("Circular dependency detected between nodes: {nodes:?}")]
    CircularDependency { nodes: Vec<String> },

    #[error("Invalid timeout for node '{node}': must be greater than 0")]
    InvalidTimeout { node: String },

    #[error("Invalid graph timeout: must be greater than 0")]
    InvalidGraphTimeout,
}

pub type Result<T> = std::result::Result<T, ParserError>;
