// ABOUTME: Writers delivering a rendered epoch log to stdout or a log file
// ABOUTME: File logs are replaced atomically so readers never see a half-written log

use async_trait::async_trait;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::config::OutputDestination;
use super::error::{OutputError, Result};

#[async_trait]
pub trait OutputWriter: Send + Sync {
    async fn write(&self, log: &str) -> Result<()>;
}

pub struct StdoutWriter;

pub struct FileWriter {
    path: PathBuf,
}

/// Writer for a destination
pub fn writer_for(destination: &OutputDestination) -> Box<dyn OutputWriter> {
    match destination {
        OutputDestination::Stdout => Box::new(StdoutWriter),
        OutputDestination::File { path } => Box::new(FileWriter::new(path.clone())),
    }
}

/// Logs always end with exactly the newline the formatter left, or one added
fn terminated(log: &str) -> Cow<'_, str> {
    if log.ends_with('\n') {
        Cow::Borrowed(log)
    } else {
        Cow::Owned(format!("{}\n", log))
    }
}

fn write_error(action: &str, path: &Path, e: std::io::Error) -> OutputError {
    OutputError::WriteError {
        message: format!("Failed to {} {}: {}", action, path.display(), e),
    }
}

#[async_trait]
impl OutputWriter for StdoutWriter {
    async fn write(&self, log: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        let log = terminated(log);

        let written = async {
            stdout.write_all(log.as_bytes()).await?;
            stdout.flush().await
        }
        .await;
        written.map_err(|e| OutputError::WriteError {
            message: format!("Failed to write epoch log to stdout: {}", e),
        })?;

        debug!("Epoch log written to stdout ({} bytes)", log.len());
        Ok(())
    }
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sibling file the log is staged in before it replaces `path`
    fn staging_path(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| OutputError::WriteError {
                message: format!("Not a file path: {}", self.path.display()),
            })?;

        Ok(self
            .path
            .with_file_name(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

#[async_trait]
impl OutputWriter for FileWriter {
    async fn write(&self, log: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_error("create directory", parent, e))?;
        }

        let staging = self.staging_path()?;
        let log = terminated(log);

        fs::write(&staging, log.as_bytes())
            .await
            .map_err(|e| write_error("write", &staging, e))?;

        if let Err(e) = fs::rename(&staging, &self.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(write_error("replace", &self.path, e));
        }

        info!(
            "Epoch log written to {} ({} bytes)",
            self.path.display(),
            log.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_terminated_adds_single_newline() {
        assert_eq!(terminated("[]"), "[]\n");
        assert_eq!(terminated("Epoch 0\n"), "Epoch 0\n");
    }

    #[tokio::test]
    async fn test_file_writer_creates_directories() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("epochs.json");

        FileWriter::new(&path).write("[]").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[tokio::test]
    async fn test_file_writer_replaces_previous_log() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("epochs.txt");
        let writer = writer_for(&OutputDestination::File { path: path.clone() });

        writer.write("Epoch 0\nEpoch 1\n").await.unwrap();
        writer.write("Epoch 0\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Epoch 0\n");
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("epochs.txt")]);
    }

    #[tokio::test]
    async fn test_file_writer_rejects_directory_path() {
        let result = FileWriter::new("/").write("[]").await;
        assert!(matches!(result, Err(OutputError::WriteError { .. })));
    }
}
