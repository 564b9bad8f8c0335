// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for epochgraph

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "epochgraph")]
#[command(about = "Run a graph of shell commands in epochs, piping each node's output downstream")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a graph file for one or more epochs and write the epoch log
    Run {
        #[arg(help = "Path to graph YAML file")]
        graph: PathBuf,

        #[arg(short = 'n', long, default_value_t = 1, help = "Number of epochs to run")]
        epochs: usize,

        #[arg(short, long, help = "Per-node timeout in seconds, overriding the graph file")]
        timeout: Option<u64>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short, long, help = "Write the epoch log to this file instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Validate a graph file and print its execution order
    Validate {
        #[arg(help = "Path to graph YAML file")]
        graph: PathBuf,

        #[arg(long, help = "Treat warnings as errors")]
        strict: bool,
    },

    /// Serve a graph over HTTP
    Serve {
        #[arg(help = "Graph YAML file to bootstrap from (defaults to an empty graph)")]
        graph: Option<PathBuf>,

        #[arg(short, long, help = "Address to listen on")]
        bind: Option<String>,
    },

    /// Initialize a new graph file from template
    Init {
        #[arg(help = "Name of the graph to create")]
        name: String,

        #[arg(short, long, help = "Output directory", default_value = ".")]
        output_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = TemplateKind::Basic)]
        template: TemplateKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
    Yaml,
    Text,
}

impl OutputFormat {
    /// Name of the formatter registered for this format
    pub fn formatter_name(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Pretty => "pretty",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateKind {
    /// Two nodes, one edge
    Basic,
    /// Packet capture fanned out to three models merged into a fourth
    Fanout,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
