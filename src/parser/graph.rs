// ABOUTME: Graph definition files describing nodes, commands, and edges in YAML
// ABOUTME: Parses definitions and builds a ready-to-run graph engine from them

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use super::error::{ParserError, Result, ValidationError};
use crate::engine::{self, EngineOptions, GraphEngine, NodeId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Default per-node timeout for this graph, overriding the engine default
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    #[serde(deserialize_with = "deserialize_node_id")]
    pub id: NodeId,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDefinition {
    #[serde(deserialize_with = "deserialize_node_id")]
    pub source: NodeId,
    #[serde(deserialize_with = "deserialize_node_id")]
    pub target: NodeId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNodeId {
    Text(String),
    Integer(i64),
}

/// Accept node ids written as strings or integers; integers map to their
/// decimal form so `1` and `"1"` name the same node.
pub fn deserialize_node_id<'de, D>(deserializer: D) -> std::result::Result<NodeId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawNodeId::deserialize(deserializer)? {
        RawNodeId::Text(text) => text,
        RawNodeId::Integer(number) => number.to_string(),
    })
}

impl GraphDefinition {
    /// Parse graph definition from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ParserError::IoError)?;
        Self::from_yaml(&content)
    }

    /// Parse graph definition from YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let definition: GraphDefinition =
            serde_yaml::from_str(content).map_err(ParserError::YamlError)?;

        definition.validate_structure()?;

        Ok(definition)
    }

    fn validate_structure(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ParserError::MissingField("name".to_string()));
        }

        if self.nodes.is_empty() {
            return Err(ParserError::ValidationError(ValidationError::EmptyGraph));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(ParserError::ValidationError(
                    ValidationError::DuplicateNode {
                        node: node.id.clone(),
                    },
                ));
            }
        }

        Ok(())
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    /// Engine options with this graph's timeout applied on top of `base`
    pub fn engine_options(&self, base: EngineOptions) -> EngineOptions {
        match self.timeout_seconds {
            Some(seconds) => base.with_node_timeout(Duration::from_secs(seconds)),
            None => base,
        }
    }

    /// Build an engine holding every node and edge of this definition,
    /// in file order
    pub async fn build_engine(&self, options: EngineOptions) -> engine::Result<GraphEngine> {
        let engine = GraphEngine::new(self.engine_options(options));

        for node in &self.nodes {
            match node.timeout_seconds {
                Some(seconds) => {
                    engine
                        .add_node_with_timeout(
                            node.id.clone(),
                            node.command.clone(),
                            Duration::from_secs(seconds),
                        )
                        .await?
                }
                None => engine.add_node(node.id.clone(), node.command.clone()).await?,
            }
        }

        for edge in &self.edges {
            engine
                .add_edge(edge.source.clone(), edge.target.clone())
                .await?;
        }

        Ok(engine)
    }

    /// Convert definition back to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ParserError::YamlError)
    }

    /// Save definition to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path.as_ref(), yaml).map_err(ParserError::IoError)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GraphParser;

impl GraphParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<GraphDefinition> {
        let content = fs::read_to_string(path.as_ref())
            .await
            .map_err(ParserError::IoError)?;
        self.parse_string(&content)
    }

    pub fn parse_string(&self, content: &str) -> Result<GraphDefinition> {
        GraphDefinition::from_yaml(content)
    }
}

impl Default for GraphParser {
    fn default() -> Self {
        Self::new()
    }
}
