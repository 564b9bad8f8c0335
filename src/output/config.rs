// ABOUTME: Configuration types for epoch log output
// ABOUTME: Selects the log format, where the log goes, and which record fields are rendered

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub destination: OutputDestination,
    #[serde(default)]
    pub options: OutputOptions,
}

/// Where a rendered epoch log is written
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputDestination {
    #[default]
    Stdout,
    /// Replaced as a whole on every write
    File { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputOptions {
    #[serde(default)]
    pub include_timestamps: bool,
    #[serde(default)]
    pub include_colors: bool,
    #[serde(default)]
    pub max_output_length: Option<usize>,
    #[serde(default)]
    pub pretty_print: bool,
}

fn default_format() -> String {
    "json".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            destination: OutputDestination::Stdout,
            options: OutputOptions::default(),
        }
    }
}

impl OutputConfig {
    /// The given file, or stdout when `path` is `None`
    pub fn for_destination(format: &str, path: Option<&Path>) -> Self {
        let destination = match path {
            Some(path) => OutputDestination::File {
                path: path.to_path_buf(),
            },
            None => OutputDestination::Stdout,
        };

        Self {
            format: format.to_string(),
            destination,
            options: OutputOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OutputOptions) -> Self {
        self.options = options;
        self
    }
}

impl OutputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_all(mut self) -> Self {
        self.include_timestamps = true;
        self.include_colors = true;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.pretty_print = true;
        self
    }

    pub fn truncate_output(mut self, max_len: usize) -> Self {
        self.max_output_length = Some(max_len);
        self
    }
}
