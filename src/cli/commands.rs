// ABOUTME: Command implementations for the epochgraph CLI
// ABOUTME: Handles execution of run, validate, serve, and init commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::args::{OutputFormat, TemplateKind};
use super::config::Config;
use crate::engine::GraphEngine;
use crate::output::config::OutputConfig;
use crate::output::{OutputHandler, OutputOptions};
use crate::parser::{GraphDefinition, GraphParser, GraphValidator};
use crate::server::GraphServer;

/// Run a graph file for `epochs` passes and write the epoch log
pub async fn run_graph(
    graph_path: PathBuf,
    epochs: usize,
    timeout: Option<u64>,
    format: OutputFormat,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    info!("Starting graph run: {}", graph_path.display());

    let mut definition = load_valid_graph(&graph_path).await?;
    if let Some(seconds) = timeout {
        anyhow::ensure!(seconds > 0, "Timeout must be at least one second");
        definition.timeout_seconds = Some(seconds);
    }

    let engine = definition
        .build_engine(config.engine_options())
        .await
        .context("Failed to build graph")?;

    let processed = engine
        .process_epochs(epochs)
        .await
        .context("Epoch processing failed")?;
    info!("Processed {} epoch(s) of '{}'", processed.len(), definition.name);

    let output_config = OutputConfig::for_destination(format.formatter_name(), output.as_deref())
        .with_options(OutputOptions::new().include_all());

    OutputHandler::new()
        .output_epochs(&engine.epochs().await, &output_config)
        .await
        .context("Failed to write epoch log")?;

    Ok(())
}

/// Validate a graph file and print its execution order
pub async fn validate_graph(graph_path: PathBuf, strict: bool, _config: &Config) -> Result<()> {
    info!("Validating graph: {}", graph_path.display());

    let definition = GraphParser::new()
        .parse_file(&graph_path)
        .await
        .map_err(|e| anyhow::anyhow!("Graph validation failed: {}", e))?;

    let report = GraphValidator::new()
        .with_strict_mode(strict)
        .validate(&definition);

    for warning in &report.warnings {
        println!("⚠ {}", warning);
    }

    if !report.is_valid {
        for error in &report.errors {
            println!("✗ {}", error);
        }
        anyhow::bail!(
            "Graph '{}' is invalid ({} error(s), {} warning(s))",
            definition.name,
            report.errors.len(),
            report.warnings.len()
        );
    }

    println!("✓ Graph '{}' is valid", definition.name);
    println!("  Nodes: {}", definition.nodes.len());
    println!("  Edges: {}", definition.edges.len());
    if let Some(order) = &report.order {
        println!("  Order: {}", order.join(" → "));
    }

    info!("Graph validation completed successfully");
    Ok(())
}

/// Serve a graph over HTTP until Ctrl-C
pub async fn serve_graph(
    graph_path: Option<PathBuf>,
    bind: Option<String>,
    config: &Config,
) -> Result<()> {
    let engine = match graph_path.or_else(|| config.default_graph.clone()) {
        Some(path) => {
            let definition = load_valid_graph(&path).await?;
            info!(
                "Bootstrapped '{}' with {} node(s)",
                definition.name,
                definition.nodes.len()
            );
            definition
                .build_engine(config.engine_options())
                .await
                .context("Failed to build graph")?
        }
        None => {
            info!("Starting with an empty graph");
            GraphEngine::new(config.engine_options())
        }
    };

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    GraphServer::new(bind, Arc::new(engine))
        .run(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Initialize a new graph file
pub async fn init_graph(
    name: String,
    output_dir: PathBuf,
    template: TemplateKind,
    _config: &Config,
) -> Result<()> {
    info!("Initializing graph '{}' in {}", name, output_dir.display());

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir)?;
    }

    let graph_file = output_dir.join(format!("{}.yaml", name));

    if graph_file.exists() {
        anyhow::bail!("Graph file already exists: {}", graph_file.display());
    }

    std::fs::write(&graph_file, generate_graph_template(&name, template))?;

    println!("Created graph file: {}", graph_file.display());
    info!("Created graph file: {}", graph_file.display());

    Ok(())
}

/// Parse a graph file and reject it if validation reports errors
async fn load_valid_graph(path: &Path) -> Result<GraphDefinition> {
    let definition = GraphParser::new()
        .parse_file(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to parse graph: {}", e))?;

    let report = GraphValidator::new().validate(&definition);
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    if let Some(error) = report.errors.first() {
        anyhow::bail!("Invalid graph '{}': {}", definition.name, error);
    }

    info!("Loaded graph: {}", definition.name);
    Ok(definition)
}

fn generate_graph_template(name: &str, template: TemplateKind) -> String {
    match template {
        TemplateKind::Basic => generate_basic_template(name),
        TemplateKind::Fanout => generate_fanout_template(name),
    }
}

fn generate_basic_template(name: &str) -> String {
    format!(
        r#"name: {}
description: A basic two-node graph

nodes:
  - id: greet
    command: "echo 'Hello from {}'"
  - id: shout
    command: "tr '[:lower:]' '[:upper:]'"

edges:
  - source: greet
    target: shout
"#,
        name, name
    )
}

/// A single captured packet fanned out to three models whose answers
/// merge into a fourth
fn generate_fanout_template(name: &str) -> String {
    format!(
        r#"name: {}
description: Packet capture fanned out to three models and merged by a fourth
timeout_seconds: 10

nodes:
  - id: 1
    command: "tcpdump -c 1 -nn -i any"
  - id: 2
    command: "ollama run gemma3:1b"
  - id: 3
    command: "ollama run qwen2.5:1.5b"
  - id: 4
    command: "ollama run llama3.2:1b"
  - id: 5
    command: "ollama run llama3:1b"

edges:
  - {{ source: 1, target: 2 }}
  - {{ source: 1, target: 3 }}
  - {{ source: 1, target: 4 }}
  - {{ source: 2, target: 5 }}
  - {{ source: 3, target: 5 }}
  - {{ source: 4, target: 5 }}
"#,
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse_and_validate() {
        for template in [TemplateKind::Basic, TemplateKind::Fanout] {
            let yaml = generate_graph_template("demo", template);
            let definition = GraphDefinition::from_yaml(&yaml).unwrap();
            let report = GraphValidator::new().validate(&definition);

            assert_eq!(definition.name, "demo");
            assert!(report.is_valid, "{:?}", report.errors);
        }
    }

    #[test]
    fn test_fanout_template_order() {
        let yaml = generate_graph_template("fanout", TemplateKind::Fanout);
        let definition = GraphDefinition::from_yaml(&yaml).unwrap();
        let report = GraphValidator::new().validate(&definition);

        assert_eq!(
            report.order,
            Some(vec![
                "1".to_string(),
                "2".to_string(),
                "3".to_string(),
                "4".to_string(),
                "5".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::default();

        init_graph(
            "demo".to_string(),
            temp_dir.path().to_path_buf(),
            TemplateKind::Basic,
            &config,
        )
        .await
        .unwrap();

        let again = init_graph(
            "demo".to_string(),
            temp_dir.path().to_path_buf(),
            TemplateKind::Basic,
            &config,
        )
        .await;
        assert!(again.is_err());
    }
}
