// ABOUTME: Configuration management for the epochgraph application
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::{EngineOptions, DEFAULT_NODE_TIMEOUT, DEFAULT_SHELL};

pub const DEFAULT_BIND: &str = "127.0.0.1:5001";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Graph file loaded by `serve` when none is given on the command line
    #[serde(default)]
    pub default_graph: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_node_timeout")]
    pub node_timeout_seconds: u64,
    #[serde(default = "default_shell")]
    pub shell: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_node_timeout() -> u64 {
    DEFAULT_NODE_TIMEOUT.as_secs()
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_timeout_seconds: default_node_timeout(),
            shell: default_shell(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Configuration file not found: {}", p.display());
                }
                Some(p)
            }
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(config_path) => {
                let contents = std::fs::read_to_string(&config_path).with_context(|| {
                    format!("Failed to read config file {}", config_path.display())
                })?;
                serde_yaml::from_str(&contents).with_context(|| {
                    format!("Failed to parse config file {}", config_path.display())
                })?
            }
            None => Config::default(),
        };

        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.engine.node_timeout_seconds == 0 {
            anyhow::bail!("engine.node_timeout_seconds must be greater than zero");
        }
        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".epochgraph").join("config.yaml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        [
            "epochgraph.yaml",
            "epochgraph.yml",
            ".epochgraph.yaml",
            ".epochgraph.yml",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    fn merge_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timeout) = lookup("EPOCHGRAPH_NODE_TIMEOUT") {
            self.engine.node_timeout_seconds = timeout
                .parse()
                .with_context(|| format!("Invalid EPOCHGRAPH_NODE_TIMEOUT '{}'", timeout))?;
        }
        if let Some(shell) = lookup("EPOCHGRAPH_SHELL") {
            self.engine.shell = shell;
        }
        if let Some(bind) = lookup("EPOCHGRAPH_BIND") {
            self.server.bind = bind;
        }
        if let Some(level) = lookup("EPOCHGRAPH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("EPOCHGRAPH_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(graph) = lookup("EPOCHGRAPH_DEFAULT_GRAPH") {
            self.default_graph = Some(PathBuf::from(graph));
        }

        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::default()
            .with_shell(self.engine.shell.clone())
            .with_node_timeout(Duration::from_secs(self.engine.node_timeout_seconds))
    }
}
