// ABOUTME: Parser module for YAML graph definitions
// ABOUTME: Exports graph definition parsing, validation, and data structures

pub mod error;
pub mod graph;
pub mod validation;

pub use error::{ParserError, ValidationError};
pub use graph::{
    deserialize_node_id, EdgeDefinition, GraphDefinition, GraphParser, NodeDefinition,
};
pub use validation::{GraphValidator, ValidationReport};
