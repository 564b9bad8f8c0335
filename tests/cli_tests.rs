// ABOUTME: Integration tests for the CLI application
// ABOUTME: Drives the built binary through run, validate, and init end to end

use std::path::Path;
use std::process::{Command, Output};
use tokio::fs;

mod common;
use common::{read_json_output, TestEnvironment, TestGraphBuilder};

/// Run the binary inside the test directory with an isolated config file
fn epochgraph(env: &TestEnvironment, args: &[&str]) -> Output {
    let config = env.path().join("cli-config.yaml");
    std::fs::write(&config, "logging:\n  level: warn\n").expect("Failed to write config");

    Command::new(env!("CARGO_BIN_EXE_epochgraph"))
        .current_dir(env.path())
        .arg("--config")
        .arg(&config)
        .arg("--no-color")
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_cli_help_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_epochgraph"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("epochgraph"));
    for command in ["run", "validate", "serve", "init"] {
        assert!(stdout.contains(command));
    }
}

#[test]
fn test_cli_version_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_epochgraph"))
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_cli_run_prints_json_epochs() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("cli_run")
        .add_node("1", "echo hello")
        .add_node("2", "cat")
        .add_edge("1", "2");
    let graph_file = env.create_graph_file("run", &builder).await;

    let output = epochgraph(&env, &["run", path_arg(&graph_file), "--epochs", "2"]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let epochs = parsed.as_array().unwrap();
    assert_eq!(epochs.len(), 2);
    assert_eq!(epochs[1]["epoch"], 1);
    assert_eq!(epochs[1]["node_props"]["2"]["output"], "hello\n");
    assert!(epochs[0]["node_props"]["1"]["color"]
        .as_str()
        .unwrap()
        .starts_with("rgb("));
}

#[tokio::test]
async fn test_cli_run_with_output_file() {
    let env = TestEnvironment::new();
    let output_file = env.output_file("cli_output");
    let builder = TestGraphBuilder::new("cli_output").add_node("only", "echo written");
    let graph_file = env.create_graph_file("output", &builder).await;

    let output = epochgraph(
        &env,
        &[
            "run",
            path_arg(&graph_file),
            "--format",
            "pretty",
            "--output",
            path_arg(&output_file),
        ],
    );

    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let parsed = read_json_output(&output_file).await.unwrap();
    assert_eq!(parsed[0]["node_props"]["only"]["output"], "written\n");
}

#[tokio::test]
async fn test_cli_run_text_format_with_timeout_override() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("cli_timeout")
        .with_timeout(30)
        .add_node("slow", "sleep 10")
        .add_node("after", "cat")
        .add_edge("slow", "after");
    let graph_file = env.create_graph_file("timeout", &builder).await;

    let output = epochgraph(
        &env,
        &["run", path_arg(&graph_file), "--timeout", "1", "--format", "text"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Epoch 0 (order: slow → after)"));
    assert!(stdout.contains("Timeout expired"));
    assert!(stdout.contains("1 epoch(s) recorded"));
}

#[tokio::test]
async fn test_cli_run_rejects_cycle() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("cli_cycle")
        .add_node("a", "cat")
        .add_node("b", "cat")
        .add_edge("a", "b")
        .add_edge("b", "a");
    let graph_file = env.create_graph_file("cycle", &builder).await;

    let output = epochgraph(&env, &["run", path_arg(&graph_file)]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Circular dependency"));
}

#[tokio::test]
async fn test_cli_validate_graph() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("cli_validate")
        .add_node("1", "echo a")
        .add_node("2", "cat")
        .add_edge("1", "2");
    let graph_file = env.create_graph_file("validate", &builder).await;

    let output = epochgraph(&env, &["validate", path_arg(&graph_file)]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ Graph 'cli_validate' is valid"));
    assert!(stdout.contains("Order: 1 → 2"));
}

#[tokio::test]
async fn test_cli_validate_invalid_graph() {
    let env = TestEnvironment::new();
    let graph_file = env.graph_file("invalid");
    fs::write(
        &graph_file,
        "name: invalid\nnodes:\n  - { id: a, command: cat }\nedges:\n  - { source: a, target: b }\n",
    )
    .await
    .unwrap();

    let output = epochgraph(&env, &["validate", path_arg(&graph_file)]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("✗"));
}

#[tokio::test]
async fn test_cli_validate_strict_fails_on_warnings() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("cli_strict")
        .add_node("1", "echo a")
        .add_empty_node("2");
    let graph_file = env.create_graph_file("strict", &builder).await;

    let lenient = epochgraph(&env, &["validate", path_arg(&graph_file)]);
    assert!(lenient.status.success());
    assert!(String::from_utf8_lossy(&lenient.stdout).contains("⚠"));

    let strict = epochgraph(&env, &["validate", "--strict", path_arg(&graph_file)]);
    assert!(!strict.status.success());
}

#[tokio::test]
async fn test_cli_verbose_beats_rust_log() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("cli_verbose").add_node("1", "echo a");
    let graph_file = env.create_graph_file("verbose", &builder).await;
    let config = env.path().join("cli-config.yaml");
    std::fs::write(&config, "logging:\n  level: warn\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_epochgraph"))
        .current_dir(env.path())
        .arg("--config")
        .arg(&config)
        .args(["--no-color", "--verbose", "validate", path_arg(&graph_file)])
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Logging initialized"));
}

#[test]
fn test_cli_rejects_zero_node_timeout_from_environment() {
    let env = TestEnvironment::new();

    let output = Command::new(env!("CARGO_BIN_EXE_epochgraph"))
        .current_dir(env.path())
        .args(["--no-color", "validate", "graph.yaml"])
        .env("EPOCHGRAPH_NODE_TIMEOUT", "0")
        .env("HOME", env.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("node_timeout_seconds"));
}

#[tokio::test]
async fn test_cli_init_templates() {
    let env = TestEnvironment::new();
    let graphs_dir = env.path().join("graphs");

    for template in ["basic", "fanout"] {
        let output = epochgraph(
            &env,
            &[
                "init",
                template,
                "--output-dir",
                path_arg(&graphs_dir),
                "--template",
                template,
            ],
        );
        assert!(output.status.success());

        let created = graphs_dir.join(format!("{}.yaml", template));
        let validate = epochgraph(&env, &["validate", path_arg(&created)]);
        assert!(validate.status.success());
    }

    let fanout = fs::read_to_string(graphs_dir.join("fanout.yaml")).await.unwrap();
    assert!(fanout.contains("tcpdump -c 1 -nn -i any"));
    assert!(fanout.contains("ollama run llama3:1b"));

    let again = epochgraph(
        &env,
        &["init", "basic", "--output-dir", path_arg(&graphs_dir)],
    );
    assert!(!again.status.success());
}
