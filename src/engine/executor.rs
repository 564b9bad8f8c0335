// ABOUTME: Graph engine owning the store, runner and epoch log
// ABOUTME: Drives epochs node by node in topological order and serializes structural edits

use chrono::Utc;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{info, instrument};

use super::epoch::{EpochLog, EpochRecord};
use super::error::Result;
use super::runner::{NodeJob, NodeRunner, DEFAULT_NODE_TIMEOUT, DEFAULT_SHELL};
use super::scheduler::Scheduler;
use super::store::{GraphStore, GraphStructure, NodeId, SharedStore};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub shell: String,
    pub node_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            node_timeout: DEFAULT_NODE_TIMEOUT,
        }
    }
}

impl EngineOptions {
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

/// One graph with its epoch history.
///
/// Epochs, node additions and edge additions are serialized through a single
/// run lock. Reads only touch the store and the log, so they stay available
/// while an epoch runs and can observe a node's output as it streams in.
pub struct GraphEngine {
    store: SharedStore,
    epochs: RwLock<EpochLog>,
    runner: NodeRunner,
    run_lock: Mutex<()>,
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl GraphEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            store: Arc::new(RwLock::new(GraphStore::new())),
            epochs: RwLock::new(EpochLog::new()),
            runner: NodeRunner::new(options.shell, options.node_timeout),
            run_lock: Mutex::new(()),
        }
    }

    pub fn runner(&self) -> &NodeRunner {
        &self.runner
    }

    pub async fn add_node(
        &self,
        id: impl Into<NodeId>,
        command: Option<String>,
    ) -> Result<()> {
        let _guard = self.run_lock.lock().await;
        self.store.write().await.add_node(id.into(), command)
    }

    pub async fn add_node_with_timeout(
        &self,
        id: impl Into<NodeId>,
        command: Option<String>,
        timeout: Duration,
    ) -> Result<()> {
        let _guard = self.run_lock.lock().await;
        self.store
            .write()
            .await
            .add_node_with_timeout(id.into(), command, timeout)
    }

    pub async fn add_edge(
        &self,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Result<()> {
        let _guard = self.run_lock.lock().await;
        self.store
            .write()
            .await
            .add_edge(source.into(), target.into())
    }

    /// Run every node once in topological order and record the pass.
    ///
    /// A cyclic graph aborts before any node runs; nothing is recorded and
    /// the epoch counter does not advance. Dropping the future mid-epoch
    /// kills the running node and records nothing; callers that must not be
    /// cancelled should drive it on a spawned task.
    #[instrument(skip(self))]
    pub async fn process_epoch(&self) -> Result<u64> {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        let started_at = Utc::now();

        let order = Scheduler::order(&*self.store.read().await)?;
        let epoch = self.epochs.read().await.next_epoch();

        info!("Starting epoch {} over {} nodes", epoch, order.len());

        let mut statuses = IndexMap::with_capacity(order.len());
        for node_id in &order {
            let job = self.job_for(node_id).await;
            let run = self.runner.run(&job, &self.store).await;
            statuses.insert(run.node_id, run.status);
        }

        let record = {
            let store = self.store.read().await;
            EpochRecord::capture(epoch, started_at, order, &statuses, &store)
        };
        self.epochs.write().await.append(record);

        info!("Epoch {} completed in {:?}", epoch, started.elapsed());
        Ok(epoch)
    }

    /// Run `count` epochs back to back, stopping at the first structural error
    pub async fn process_epochs(&self, count: usize) -> Result<Vec<u64>> {
        let mut epochs = Vec::with_capacity(count);
        for _ in 0..count {
            epochs.push(self.process_epoch().await?);
        }
        Ok(epochs)
    }

    /// Input and command for a node, read from the store after every
    /// predecessor in this epoch has finished
    async fn job_for(&self, node_id: &str) -> NodeJob {
        let store = self.store.read().await;
        let node = store.node(node_id);

        NodeJob {
            id: node_id.to_string(),
            command: node.and_then(|n| n.command.clone()),
            timeout: node.and_then(|n| n.timeout),
            input: store.input_for(node_id),
        }
    }

    pub async fn topological_order(&self) -> Result<Vec<NodeId>> {
        Ok(Scheduler::order(&*self.store.read().await)?)
    }

    pub async fn structure(&self) -> GraphStructure {
        self.store.read().await.structure()
    }

    pub async fn node_output(&self, node_id: &str) -> Option<String> {
        self.store.read().await.output(node_id).map(str::to_string)
    }

    pub async fn node_count(&self) -> usize {
        self.store.read().await.node_count()
    }

    pub async fn edge_count(&self) -> usize {
        self.store.read().await.edge_count()
    }

    pub async fn epochs(&self) -> Vec<EpochRecord> {
        self.epochs.read().await.records().to_vec()
    }

    pub async fn epoch(&self, epoch: u64) -> Option<EpochRecord> {
        self.epochs.read().await.get(epoch).cloned()
    }

    pub async fn current_epoch(&self) -> Option<u64> {
        self.epochs.read().await.current_epoch()
    }
}
