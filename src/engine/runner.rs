// ABOUTME: Node runner executing one node's command line through a shell
// ABOUTME: Feeds upstream output on stdin, streams stdout into the store, enforces a per-run timeout

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use super::store::{NodeId, SharedStore};

/// Output recorded for a node whose process outlived its timeout
pub const TIMEOUT_SENTINEL: &str = "Timeout expired";

pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// How long capture tasks may keep running once the process is gone
const CAPTURE_GRACE: Duration = Duration::from_millis(500);

/// How a single node run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeRunStatus {
    Completed { exit_code: Option<i32> },
    TimedOut,
    Failed { message: String },
    Skipped,
}

/// Everything the runner needs to execute one node
#[derive(Debug, Clone)]
pub struct NodeJob {
    pub id: NodeId,
    pub command: Option<String>,
    pub timeout: Option<Duration>,
    pub input: String,
}

#[derive(Debug, Clone)]
pub struct NodeRun {
    pub node_id: NodeId,
    pub status: NodeRunStatus,
    pub output: String,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct NodeRunner {
    shell: String,
    default_timeout: Duration,
}

impl fmt::Display for NodeRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRunStatus::Completed {
                exit_code: Some(code),
            } => write!(f, "completed (exit {})", code),
            NodeRunStatus::Completed { exit_code: None } => write!(f, "completed (signal)"),
            NodeRunStatus::TimedOut => write!(f, "timed out"),
            NodeRunStatus::Failed { message } => write!(f, "failed: {}", message),
            NodeRunStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl Default for NodeRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL, DEFAULT_NODE_TIMEOUT)
    }
}

impl NodeRunner {
    pub fn new(shell: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            default_timeout,
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run one node to completion and store its final output.
    ///
    /// Execution problems never escape as errors: a timeout stores
    /// [`TIMEOUT_SENTINEL`], any other failure stores the error message.
    /// The store must not be locked by the caller while this runs, since
    /// stdout is published into it as it arrives. Dropping the returned
    /// future kills the node's process group and stops its capture tasks,
    /// so nothing touches the store afterwards.
    pub async fn run(&self, job: &NodeJob, store: &SharedStore) -> NodeRun {
        let started = Instant::now();
        let timeout = job.timeout.unwrap_or(self.default_timeout);

        let command = job
            .command
            .as_deref()
            .filter(|command| !command.trim().is_empty());

        let (status, output) = match command {
            Some(command) => {
                info!("Running node {}: {}", job.id, command);
                self.execute(job, command, timeout, store).await
            }
            None => {
                warn!("Node {} has no command, recording empty output", job.id);
                (NodeRunStatus::Skipped, String::new())
            }
        };

        store.write().await.set_output(&job.id, output.clone());

        let duration = started.elapsed();
        info!("Node {} {} in {:?}", job.id, status, duration);

        NodeRun {
            node_id: job.id.clone(),
            status,
            output,
            duration,
        }
    }

    async fn execute(
        &self,
        job: &NodeJob,
        command: &str,
        timeout: Duration,
        store: &SharedStore,
    ) -> (NodeRunStatus, String) {
        let deadline = Instant::now() + timeout;

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to start node {}: {}", job.id, e);
                return failure(e);
            }
        };
        let mut group = ProcessGroup::of(&child);

        // Readers watching this node see the new run from its first line
        store.write().await.set_output(&job.id, String::new());

        let mut capture = JoinSet::new();
        if let Some(stdout) = child.stdout.take() {
            capture.spawn(capture_stdout(job.id.clone(), stdout, Arc::clone(store)));
        }
        if let Some(stderr) = child.stderr.take() {
            capture.spawn(drain_stderr(job.id.clone(), stderr));
        }
        let stdin = child.stdin.take();

        let outcome = timeout_at(deadline, wait_with_input(&mut child, stdin, &job.input)).await;

        match outcome {
            Ok(Ok(exit)) => {
                let join_deadline = deadline.max(Instant::now() + CAPTURE_GRACE);
                let output = match collect_stdout(&mut capture, join_deadline).await {
                    Some(output) => output,
                    None => store.read().await.output(&job.id).unwrap_or_default().to_string(),
                };
                group.kill(&job.id);
                debug!("Node {} exited with {}", job.id, exit);
                (
                    NodeRunStatus::Completed {
                        exit_code: exit.code(),
                    },
                    output,
                )
            }
            Ok(Err(e)) => {
                error!("Node {} failed while running: {}", job.id, e);
                terminate(&job.id, &mut child, &mut group).await;
                collect_stdout(&mut capture, Instant::now() + CAPTURE_GRACE).await;
                failure(e)
            }
            Err(_) => {
                warn!(
                    "Timeout reached for node {} after {:?}, killing its process group",
                    job.id, timeout
                );
                terminate(&job.id, &mut child, &mut group).await;
                collect_stdout(&mut capture, Instant::now() + CAPTURE_GRACE).await;
                (NodeRunStatus::TimedOut, TIMEOUT_SENTINEL.to_string())
            }
        }
    }
}

/// Result of one capture task
enum Capture {
    Stdout(String),
    Stderr,
}

/// Process group led by a node's shell. Every process left in it is killed
/// when the run ends, including when the run future is dropped.
struct ProcessGroup {
    pgid: Option<Pid>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        let pgid = child
            .id()
            .and_then(|id| i32::try_from(id).ok())
            .map(Pid::from_raw);
        Self { pgid }
    }

    fn kill(&mut self, node_id: &str) {
        if let Some(pgid) = self.pgid.take() {
            match killpg(pgid, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!("Failed to kill process group of node {}: {}", node_id, e),
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            let _ = killpg(pgid, Signal::SIGKILL);
        }
    }
}

fn failure(e: io::Error) -> (NodeRunStatus, String) {
    let message = e.to_string();
    (
        NodeRunStatus::Failed {
            message: message.clone(),
        },
        message,
    )
}

/// Write the input text, close stdin, then wait for the process to exit
async fn wait_with_input(
    child: &mut Child,
    stdin: Option<ChildStdin>,
    input: &str,
) -> io::Result<ExitStatus> {
    if let Some(mut stdin) = stdin {
        if !input.is_empty() {
            match stdin.write_all(input.as_bytes()).await {
                Ok(()) => {}
                // The process exited or closed stdin without reading everything
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!("stdin closed early by child: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        drop(stdin);
    }

    child.wait().await
}

/// Kill the whole process group, then reap the shell
async fn terminate(node_id: &str, child: &mut Child, group: &mut ProcessGroup) {
    group.kill(node_id);
    if let Err(e) = child.kill().await {
        warn!("Failed to kill process for node {}: {}", node_id, e);
    }
}

async fn capture_stdout(node_id: NodeId, stdout: ChildStdout, store: SharedStore) -> Capture {
    let mut reader = BufReader::new(stdout);
    let mut buffer = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                debug!(
                    "Node {} output: {}",
                    node_id,
                    String::from_utf8_lossy(&line).trim_end()
                );
                buffer.extend_from_slice(&line);
                let partial = String::from_utf8_lossy(&buffer).into_owned();
                store.write().await.set_output(&node_id, partial);
            }
            Err(e) => {
                warn!("Error reading stdout of node {}: {}", node_id, e);
                break;
            }
        }
    }

    Capture::Stdout(String::from_utf8_lossy(&buffer).into_owned())
}

async fn drain_stderr(node_id: NodeId, stderr: ChildStderr) -> Capture {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => debug!(
                "Node {} error: {}",
                node_id,
                String::from_utf8_lossy(&line).trim_end()
            ),
            Err(e) => {
                warn!("Error reading stderr of node {}: {}", node_id, e);
                break;
            }
        }
    }

    Capture::Stderr
}

/// Wait for the capture tasks until the deadline and return the collected
/// stdout. Tasks still running then, because a stray process keeps a pipe
/// open, are aborted and `None` is returned.
async fn collect_stdout(capture: &mut JoinSet<Capture>, deadline: Instant) -> Option<String> {
    let mut stdout = None;

    loop {
        match timeout_at(deadline, capture.join_next()).await {
            Ok(Some(Ok(Capture::Stdout(output)))) => stdout = Some(output),
            Ok(Some(Ok(Capture::Stderr))) => {}
            Ok(Some(Err(e))) => warn!("Output capture task failed: {}", e),
            Ok(None) => break,
            Err(_) => {
                warn!("Output pipe still open after process exit, abandoning capture");
                capture.shutdown().await;
                break;
            }
        }
    }

    stdout
}
