// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides shared functionality for setting up test environments and graph files

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

use epochgraph::engine::GraphEngine;

pub struct TestGraphBuilder {
    name: String,
    description: String,
    timeout_seconds: Option<u64>,
    nodes: Vec<TestNode>,
    edges: Vec<(String, String)>,
}

pub struct TestNode {
    pub id: String,
    pub command: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl TestGraphBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Test graph: {}", name),
            timeout_seconds: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn add_node(mut self, id: &str, command: &str) -> Self {
        self.nodes.push(TestNode {
            id: id.to_string(),
            command: Some(command.to_string()),
            timeout_seconds: None,
        });
        self
    }

    pub fn add_empty_node(mut self, id: &str) -> Self {
        self.nodes.push(TestNode {
            id: id.to_string(),
            command: None,
            timeout_seconds: None,
        });
        self
    }

    pub fn add_timed_node(mut self, id: &str, command: &str, timeout_seconds: u64) -> Self {
        self.nodes.push(TestNode {
            id: id.to_string(),
            command: Some(command.to_string()),
            timeout_seconds: Some(timeout_seconds),
        });
        self
    }

    pub fn add_edge(mut self, source: &str, target: &str) -> Self {
        self.edges.push((source.to_string(), target.to_string()));
        self
    }

    pub async fn write_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, self.generate_yaml()).await?;
        Ok(())
    }

    pub fn generate_yaml(&self) -> String {
        let mut yaml = format!(
            "name: {}\ndescription: {:?}\n",
            self.name, self.description
        );

        if let Some(seconds) = self.timeout_seconds {
            yaml.push_str(&format!("timeout_seconds: {}\n", seconds));
        }

        yaml.push_str("\nnodes:\n");
        for node in &self.nodes {
            yaml.push_str(&format!("  - id: {:?}\n", node.id));
            if let Some(command) = &node.command {
                yaml.push_str(&format!("    command: {:?}\n", command));
            }
            if let Some(seconds) = node.timeout_seconds {
                yaml.push_str(&format!("    timeout_seconds: {}\n", seconds));
            }
        }

        if !self.edges.is_empty() {
            yaml.push_str("\nedges:\n");
            for (source, target) in &self.edges {
                yaml.push_str(&format!(
                    "  - {{ source: {:?}, target: {:?} }}\n",
                    source, target
                ));
            }
        }

        yaml
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn graph_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.yaml", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_epochs.json", name))
    }

    pub async fn create_graph_file(&self, name: &str, builder: &TestGraphBuilder) -> PathBuf {
        let graph_file = self.graph_file(name);
        builder
            .write_to_file(&graph_file)
            .await
            .expect("Failed to write graph file");
        graph_file
    }
}

/// A → B where A echoes `message` and B copies its input
pub async fn echo_pipeline(message: &str) -> GraphEngine {
    let engine = GraphEngine::default();
    engine
        .add_node("A", Some(format!("echo {}", message)))
        .await
        .unwrap();
    engine.add_node("B", Some("cat".to_string())).await.unwrap();
    engine.add_edge("A", "B").await.unwrap();
    engine
}

pub async fn read_json_output(
    file_path: &Path,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path).await?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use epochgraph::parser::GraphDefinition;

    #[test]
    fn test_graph_builder() {
        let builder = TestGraphBuilder::new("test_graph")
            .with_description("Test graph description")
            .with_timeout(5)
            .add_node("1", "echo 'hi there'")
            .add_empty_node("2")
            .add_edge("1", "2");

        let definition = GraphDefinition::from_yaml(&builder.generate_yaml()).unwrap();

        assert_eq!(definition.name, "test_graph");
        assert_eq!(definition.timeout_seconds, Some(5));
        assert_eq!(definition.nodes[0].command.as_deref(), Some("echo 'hi there'"));
        assert_eq!(definition.nodes[1].command, None);
        assert_eq!(definition.edges[0].target, "2");
    }

    #[test]
    fn test_environment_setup() {
        let env = TestEnvironment::new();
        assert!(env.path().exists());

        let graph_file = env.graph_file("test");
        assert!(graph_file.to_string_lossy().contains("test.yaml"));
    }
}
