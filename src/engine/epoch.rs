// ABOUTME: Epoch records snapshotting node outputs and display metadata after each pass
// ABOUTME: Also derives deterministic display colors from node and edge identities

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::runner::NodeRunStatus;
use super::store::{Edge, GraphStore, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub output: Option<String>,
    pub color: String,
    pub label: String,
    pub status: Option<NodeRunStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub edge_data: String,
    pub color: String,
    pub label: String,
}

/// Immutable snapshot of one full pass over the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub order: Vec<NodeId>,
    pub node_props: IndexMap<NodeId, NodeSnapshot>,
    pub edge_props: IndexMap<String, EdgeSnapshot>,
}

/// Append-only log of epoch records
#[derive(Debug, Default)]
pub struct EpochLog {
    records: Vec<EpochRecord>,
}

impl EpochRecord {
    /// Snapshot the store as it stands after a pass
    pub fn capture(
        epoch: u64,
        started_at: DateTime<Utc>,
        order: Vec<NodeId>,
        statuses: &IndexMap<NodeId, NodeRunStatus>,
        store: &GraphStore,
    ) -> Self {
        let node_props = store
            .nodes()
            .map(|node| {
                let snapshot = NodeSnapshot {
                    output: node.output.clone(),
                    color: node_color(&node.id),
                    label: node_label(&node.id),
                    status: statuses.get(&node.id).cloned(),
                };
                (node.id.clone(), snapshot)
            })
            .collect();

        let edge_props = store
            .edges()
            .iter()
            .map(|edge| {
                let snapshot = EdgeSnapshot {
                    edge_data: format!("Edge {} → {}", edge.source, edge.target),
                    color: edge_color(edge),
                    label: format!("Edge from {} to {}", edge.source, edge.target),
                };
                (edge_key(edge), snapshot)
            })
            .collect();

        Self {
            epoch,
            started_at,
            completed_at: Utc::now(),
            order,
            node_props,
            edge_props,
        }
    }

    pub fn node_output(&self, node_id: &str) -> Option<&str> {
        self.node_props
            .get(node_id)
            .and_then(|snapshot| snapshot.output.as_deref())
    }
}

impl EpochLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number the next record will carry
    pub fn next_epoch(&self) -> u64 {
        self.records.len() as u64
    }

    /// Latest recorded epoch, if any
    pub fn current_epoch(&self) -> Option<u64> {
        self.records.last().map(|record| record.epoch)
    }

    pub fn append(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EpochRecord] {
        &self.records
    }

    pub fn get(&self, epoch: u64) -> Option<&EpochRecord> {
        self.records.iter().find(|record| record.epoch == epoch)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn node_label(node_id: &str) -> String {
    format!("Node {}", node_id)
}

pub fn edge_key(edge: &Edge) -> String {
    format!("{}_{}", edge.source, edge.target)
}

pub fn node_color(node_id: &str) -> String {
    display_color(node_id)
}

pub fn edge_color(edge: &Edge) -> String {
    display_color(&edge_key(edge))
}

/// Map an identity to an `rgb(r, g, b)` color with every channel in 100..=255.
/// The same identity always yields the same color.
pub fn display_color(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    let channel = |byte: u8| 100 + u16::from(byte) % 156;

    format!(
        "rgb({}, {}, {})",
        channel(digest[0]),
        channel(digest[1]),
        channel(digest[2])
    )
}
