//! Trace record store: one JSONL file per (scaffold, dataset) pair.
//!
//! Records are appended in call order and flushed synchronously, so a crash
//! loses at most the in-flight call. The `input`/`output` flattening rule
//! here is the single source of comparability across scaffolds: the
//! external analyzer tokenizes exactly these strings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use crate::llm::ChatMessage;

/// One language-model call, as written to the trace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Capture time, unix microseconds.
    pub timestamp: i64,
    /// Flattened prompt text (role-prefixed lines joined by newline).
    pub input: String,
    /// Flattened reply text (content, or first serialized tool call).
    pub output: String,
    /// Which scaffold/run produced this record.
    pub session_id: String,
    /// Open extension fields (model, finish_reason, token counts, latency,
    /// call classification), serialized inline at the same level.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Flatten a message list to the canonical trace `input` representation:
/// one `role: content` line per message, original order, newline-joined.
/// Multimodal content is reduced to its text-only parts.
pub fn flatten_messages(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content.as_flat_text()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn now_unix_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// Append-only JSONL writer for trace records. Single writer per run;
/// exclusive ownership of the file handle for the run's duration.
pub struct TraceLogger {
    output_path: PathBuf,
    session_id: String,
    writer: Mutex<BufWriter<File>>,
}

impl TraceLogger {
    /// Create (truncating any previous file) the trace file for one run.
    pub fn create(output_path: impl AsRef<Path>, session_id: impl Into<String>) -> Result<Self> {
        let output_path = output_path.as_ref().to_path_buf();
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create trace directory: {parent:?}"))?;
        }
        let session_id = session_id.into();
        let file = File::create(&output_path)
            .with_context(|| format!("Failed to create trace file: {output_path:?}"))?;

        info!(
            session_id = %session_id,
            trace_file = %output_path.display(),
            "Initializing trace logger"
        );

        Ok(Self {
            output_path,
            session_id,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append one record and flush. A write failure here must propagate:
    /// an incomplete trace file is worse than a visible collection failure.
    pub fn log(
        &self,
        input: impl Into<String>,
        output: impl Into<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        let record = TraceRecord {
            timestamp: now_unix_micros(),
            input: input.into(),
            output: output.into(),
            session_id: self.session_id.clone(),
            metadata,
        };
        let line = serde_json::to_string(&record).context("Failed to serialize trace record")?;

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{line}")
            .with_context(|| format!("Failed to append trace record: {:?}", self.output_path))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush trace file: {:?}", self.output_path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ContentBlock, MessageContent};
    use tempfile::TempDir;

    #[test]
    fn flatten_drops_non_text_blocks_and_keeps_order() {
        let messages = vec![
            ChatMessage::system("You are helpful."),
            ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Blocks(vec![
                    ContentBlock {
                        kind: "text".to_string(),
                        text: Some("First part.".to_string()),
                    },
                    ContentBlock {
                        kind: "image_url".to_string(),
                        text: None,
                    },
                    ContentBlock {
                        kind: "text".to_string(),
                        text: Some("Second part.".to_string()),
                    },
                ]),
            },
        ];

        let rendered = flatten_messages(&messages);
        assert_eq!(
            rendered,
            "system: You are helpful.\nuser: First part. Second part."
        );
        assert!(!rendered.contains("image_url"));
    }

    #[test]
    fn logger_round_trips_records_verbatim() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("session.jsonl");

        let logger = TraceLogger::create(&path, "unit-test")?;
        let mut metadata = serde_json::Map::new();
        metadata.insert("model".to_string(), "gpt-test".into());
        metadata.insert("prompt_tokens".to_string(), 4.into());
        logger.log("user: hello", "assistant: hi", metadata)?;
        logger.log("user: again", "assistant: yes", serde_json::Map::new())?;

        let lines: Vec<String> = std::fs::read_to_string(&path)?
            .lines()
            .map(String::from)
            .collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(&lines[0])?;
        assert_eq!(first["session_id"], "unit-test");
        assert_eq!(first["input"], "user: hello");
        assert_eq!(first["output"], "assistant: hi");
        assert_eq!(first["model"], "gpt-test");
        assert_eq!(first["prompt_tokens"], 4);
        assert!(first["timestamp"].as_i64().unwrap() > 0);
        Ok(())
    }
}
