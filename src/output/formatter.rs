// ABOUTME: Output formatters for epoch logs (JSON, YAML, text)
// ABOUTME: Handles serialization and presentation of recorded epochs

use async_trait::async_trait;
use serde_json::{self, Value as JsonValue};

use super::config::{OutputConfig, OutputOptions};
use super::error::{OutputError, Result};
use crate::engine::{EpochRecord, NodeRunStatus};

#[async_trait]
pub trait OutputFormatter: Send + Sync {
    async fn format_epochs(&self, records: &[EpochRecord], config: &OutputConfig)
        -> Result<String>;
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct YamlFormatter;

pub struct TextFormatter;

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }

    fn render(&self, value: &JsonValue, options: &OutputOptions) -> Result<String> {
        if self.pretty || options.pretty_print {
            serde_json::to_string_pretty(value).map_err(OutputError::SerializationError)
        } else {
            serde_json::to_string(value).map_err(OutputError::SerializationError)
        }
    }

    fn prepare_epochs_output(
        &self,
        records: &[EpochRecord],
        options: &OutputOptions,
    ) -> Result<JsonValue> {
        let epochs = records
            .iter()
            .map(|record| self.prepare_epoch_output(record, options))
            .collect::<Result<Vec<_>>>()?;
        Ok(JsonValue::Array(epochs))
    }

    fn prepare_epoch_output(&self, record: &EpochRecord, options: &OutputOptions) -> Result<JsonValue> {
        let mut output = serde_json::Map::new();

        output.insert("epoch".to_string(), JsonValue::from(record.epoch));
        output.insert("order".to_string(), serde_json::to_value(&record.order)?);

        if options.include_timestamps {
            output.insert(
                "started_at".to_string(),
                JsonValue::String(record.started_at.to_rfc3339()),
            );
            output.insert(
                "completed_at".to_string(),
                JsonValue::String(record.completed_at.to_rfc3339()),
            );
        }

        let mut nodes = serde_json::Map::new();
        for (node_id, snapshot) in &record.node_props {
            let mut node = serde_json::Map::new();
            node.insert(
                "output".to_string(),
                match snapshot.output.as_deref() {
                    Some(text) => JsonValue::String(truncate(text, options.max_output_length)),
                    None => JsonValue::Null,
                },
            );
            node.insert("label".to_string(), JsonValue::String(snapshot.label.clone()));
            node.insert("status".to_string(), serde_json::to_value(&snapshot.status)?);
            if options.include_colors {
                node.insert("color".to_string(), JsonValue::String(snapshot.color.clone()));
            }
            nodes.insert(node_id.clone(), JsonValue::Object(node));
        }
        output.insert("node_props".to_string(), JsonValue::Object(nodes));

        let mut edges = serde_json::Map::new();
        for (key, snapshot) in &record.edge_props {
            let mut edge = serde_json::Map::new();
            edge.insert(
                "edge_data".to_string(),
                JsonValue::String(snapshot.edge_data.clone()),
            );
            edge.insert("label".to_string(), JsonValue::String(snapshot.label.clone()));
            if options.include_colors {
                edge.insert("color".to_string(), JsonValue::String(snapshot.color.clone()));
            }
            edges.insert(key.clone(), JsonValue::Object(edge));
        }
        output.insert("edge_props".to_string(), JsonValue::Object(edges));

        Ok(JsonValue::Object(output))
    }
}

#[async_trait]
impl OutputFormatter for JsonFormatter {
    async fn format_epochs(
        &self,
        records: &[EpochRecord],
        config: &OutputConfig,
    ) -> Result<String> {
        let value = self.prepare_epochs_output(records, &config.options)?;
        self.render(&value, &config.options)
    }
}

#[async_trait]
impl OutputFormatter for YamlFormatter {
    async fn format_epochs(
        &self,
        records: &[EpochRecord],
        config: &OutputConfig,
    ) -> Result<String> {
        let json_value = JsonFormatter::new().prepare_epochs_output(records, &config.options)?;
        serde_yaml::to_string(&json_value).map_err(OutputError::YamlSerializationError)
    }
}

impl Default for YamlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputFormatter for TextFormatter {
    async fn format_epochs(
        &self,
        records: &[EpochRecord],
        config: &OutputConfig,
    ) -> Result<String> {
        let mut output = String::new();

        for record in records {
            output.push_str(&self.render_epoch(record, &config.options));
            output.push('\n');
        }

        output.push_str(&format!("{} epoch(s) recorded\n", records.len()));
        Ok(output)
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    fn render_epoch(&self, record: &EpochRecord, options: &OutputOptions) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Epoch {} (order: {})\n",
            record.epoch,
            record.order.join(" → ")
        ));

        if options.include_timestamps {
            output.push_str(&format!(
                "Started: {}\n",
                record.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            output.push_str(&format!(
                "Completed: {}\n",
                record.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        for snapshot in record.node_props.values() {
            let (icon, status) = match &snapshot.status {
                Some(status @ NodeRunStatus::Completed { exit_code: Some(0) }) => {
                    ("✓", status.to_string())
                }
                Some(status @ NodeRunStatus::Completed { .. }) => ("!", status.to_string()),
                Some(status @ NodeRunStatus::TimedOut) => ("⧖", status.to_string()),
                Some(status @ NodeRunStatus::Failed { .. }) => ("✗", status.to_string()),
                Some(status @ NodeRunStatus::Skipped) => ("⊘", status.to_string()),
                None => ("·", "not run".to_string()),
            };

            output.push_str(&format!("  {} {} [{}]", icon, snapshot.label, status));
            if options.include_colors {
                output.push_str(&format!(" {}", snapshot.color));
            }
            output.push('\n');

            if let Some(text) = snapshot.output.as_deref() {
                let text = truncate(text, options.max_output_length);
                for line in text.lines() {
                    output.push_str(&format!("    {}\n", line));
                }
            }
        }

        for snapshot in record.edge_props.values() {
            output.push_str(&format!("  {}", snapshot.edge_data));
            if options.include_colors {
                output.push_str(&format!(" {}", snapshot.color));
            }
            output.push('\n');
        }

        output
    }
}

fn truncate(text: &str, max_len: Option<usize>) -> String {
    match max_len {
        Some(max_len) if text.chars().count() > max_len => {
            let kept: String = text.chars().take(max_len).collect();
            format!("{}... [truncated]", kept)
        }
        _ => text.to_string(),
    }
}
