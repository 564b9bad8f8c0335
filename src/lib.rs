// ABOUTME: Main library module for the epochgraph command graph runner
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod output;
pub mod parser;
pub mod server;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{EngineOptions, EpochRecord, GraphEngine, GraphError, NodeId, NodeRunStatus};
pub use output::OutputHandler;
pub use parser::{GraphDefinition, GraphParser, GraphValidator};
pub use server::GraphServer;

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
