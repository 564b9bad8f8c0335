// ABOUTME: Graph execution engine module for epochgraph
// ABOUTME: Handles graph storage, topological scheduling, node execution, and epoch recording

pub mod epoch;
pub mod error;
pub mod executor;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use epoch::{display_color, EdgeSnapshot, EpochLog, EpochRecord, NodeSnapshot};
pub use error::{GraphError, Result};
pub use executor::{EngineOptions, GraphEngine};
pub use runner::{
    NodeJob, NodeRun, NodeRunStatus, NodeRunner, DEFAULT_NODE_TIMEOUT, DEFAULT_SHELL,
    TIMEOUT_SENTINEL,
};
pub use scheduler::{Cycle, Scheduler};
pub use store::{Edge, GraphStore, GraphStructure, Node, NodeId, NodeInfo, SharedStore};
