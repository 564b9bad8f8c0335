// ABOUTME: Graph definition validation covering endpoints, timeouts, and cycles
// ABOUTME: Collects every problem into a report instead of stopping at the first

use std::collections::HashSet;

use super::error::ValidationError;
use super::graph::GraphDefinition;
use crate::engine::{Cycle, GraphError, GraphStore, NodeId, Scheduler};

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    /// Execution order, available when the graph is acyclic
    pub order: Option<Vec<NodeId>>,
    pub is_valid: bool,
}

pub struct GraphValidator {
    strict_mode: bool,
}

impl GraphValidator {
    pub fn new() -> Self {
        Self { strict_mode: false }
    }

    /// In strict mode warnings are reported as failures too
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn validate(&self, definition: &GraphDefinition) -> ValidationReport {
        let mut report = ValidationReport::new();

        self.validate_timeouts(definition, &mut report);
        self.validate_commands(definition, &mut report);
        self.check_isolated_nodes(definition, &mut report);

        let store = self.validate_edges(definition, &mut report);
        match Scheduler::order(&store) {
            Ok(order) => report.order = Some(order),
            Err(Cycle { nodes }) => report
                .errors
                .push(ValidationError::CircularDependency { nodes }),
        }

        report.is_valid =
            report.errors.is_empty() && !(self.strict_mode && report.has_warnings());
        report
    }

    /// Load the definition into a scratch store, recording every edge that
    /// cannot be inserted
    fn validate_edges(&self, definition: &GraphDefinition, report: &mut ValidationReport) -> GraphStore {
        let mut store = GraphStore::new();

        for node in &definition.nodes {
            if store.add_node(node.id.clone(), node.command.clone()).is_err() {
                report.errors.push(ValidationError::DuplicateNode {
                    node: node.id.clone(),
                });
            }
        }

        for edge in &definition.edges {
            if let Err(GraphError::UnknownNode { node_id }) =
                store.add_edge(edge.source.clone(), edge.target.clone())
            {
                report.errors.push(ValidationError::UnknownNode {
                    source_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                    node: node_id,
                });
            }
        }

        store
    }

    fn validate_timeouts(&self, definition: &GraphDefinition, report: &mut ValidationReport) {
        if definition.timeout_seconds == Some(0) {
            report.errors.push(ValidationError::InvalidGraphTimeout);
        }

        for node in &definition.nodes {
            if node.timeout_seconds == Some(0) {
                report.errors.push(ValidationError::InvalidTimeout {
                    node: node.id.clone(),
                });
            }
        }
    }

    fn validate_commands(&self, definition: &GraphDefinition, report: &mut ValidationReport) {
        for node in &definition.nodes {
            let blank = node
                .command
                .as_deref()
                .map_or(true, |command| command.trim().is_empty());
            if blank {
                report.add_warning(format!(
                    "Node '{}' has no command and will record empty output",
                    node.id
                ));
            }
        }
    }

    fn check_isolated_nodes(&self, definition: &GraphDefinition, report: &mut ValidationReport) {
        if definition.nodes.len() < 2 {
            return;
        }

        let connected: HashSet<&str> = definition
            .edges
            .iter()
            .flat_map(|edge| [edge.source.as_str(), edge.target.as_str()])
            .collect();

        for node in &definition.nodes {
            if !connected.contains(node.id.as_str()) {
                report.add_warning(format!("Node '{}' has no edges", node.id));
            }
        }
    }
}

impl Default for GraphValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            order: None,
            is_valid: true,
        }
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
