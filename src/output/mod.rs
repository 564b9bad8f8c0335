// ABOUTME: Output handler module for epoch log formatting and persistence
// ABOUTME: Handles JSON/YAML/text formatting and output to stdout or files

pub mod config;
pub mod error;
pub mod formatter;
pub mod writer;

use std::collections::HashMap;

use self::config::OutputConfig;
use self::error::{OutputError, Result};
use self::formatter::{JsonFormatter, OutputFormatter, TextFormatter, YamlFormatter};
use self::writer::writer_for;
use crate::engine::EpochRecord;

pub use self::config::{OutputDestination, OutputOptions};

pub struct OutputHandler {
    formatters: HashMap<String, Box<dyn OutputFormatter>>,
}

impl OutputHandler {
    pub fn new() -> Self {
        let mut handler = Self {
            formatters: HashMap::new(),
        };

        handler.register_formatter("json", Box::new(JsonFormatter::new()));
        handler.register_formatter("pretty", Box::new(JsonFormatter::new_pretty()));
        handler.register_formatter("yaml", Box::new(YamlFormatter::new()));
        handler.register_formatter("text", Box::new(TextFormatter::new()));

        handler
    }

    pub fn register_formatter(&mut self, name: &str, formatter: Box<dyn OutputFormatter>) {
        self.formatters.insert(name.to_string(), formatter);
    }

    /// Format the whole epoch log and write it to the configured destination
    pub async fn output_epochs(
        &self,
        records: &[EpochRecord],
        config: &OutputConfig,
    ) -> Result<()> {
        let formatter = self
            .formatters
            .get(&config.format)
            .ok_or_else(|| OutputError::FormatterNotFound {
                format: config.format.clone(),
            })?;

        let log = formatter.format_epochs(records, config).await?;
        writer_for(&config.destination).write(&log).await
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
