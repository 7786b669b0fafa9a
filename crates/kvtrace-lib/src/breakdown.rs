//! Workload breakdown log: secondary JSONL events correlated to one run.
//!
//! Each event carries the run's shared context (run id, dataset, scaffold)
//! plus op-specific fields. Capture is best effort around the primary
//! workload call: recording an error-status event must never be the reason
//! the workload call fails.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::trace::now_unix_micros;

/// Character limit for query/prompt previews embedded in events.
pub const PREVIEW_CHARS: usize = 240;

/// One instrumented sub-operation.
#[derive(Debug, Clone, Serialize)]
pub struct BreakdownEvent {
    pub timestamp_us: i64,
    pub component: String,
    pub op: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Single-writer JSONL logger for breakdown events. The single-writer
/// assumption holds because collection is sequential by design.
pub struct BreakdownLogger {
    output_path: PathBuf,
    context: serde_json::Map<String, serde_json::Value>,
    writer: Mutex<BufWriter<File>>,
}

impl BreakdownLogger {
    pub fn create(
        output_path: impl AsRef<Path>,
        context: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        let output_path = output_path.as_ref().to_path_buf();
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create breakdown directory: {parent:?}"))?;
        }
        let file = File::create(&output_path)
            .with_context(|| format!("Failed to create breakdown file: {output_path:?}"))?;

        info!(
            breakdown_file = %output_path.display(),
            "Initializing breakdown logger"
        );

        Ok(Self {
            output_path,
            context,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Append one event (shared context merged in) and flush.
    pub fn log_event(
        &self,
        component: &str,
        op: &str,
        status: &str,
        duration_ms: Option<f64>,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        let mut merged = self.context.clone();
        merged.extend(fields);

        let event = BreakdownEvent {
            timestamp_us: now_unix_micros(),
            component: component.to_string(),
            op: op.to_string(),
            status: status.to_string(),
            duration_ms: duration_ms.map(|d| (d * 1000.0).round() / 1000.0),
            fields: merged,
        };
        let line = serde_json::to_string(&event).context("Failed to serialize breakdown event")?;

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{line}").with_context(|| {
            format!("Failed to append breakdown event: {:?}", self.output_path)
        })?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush breakdown file: {:?}", self.output_path))?;
        Ok(())
    }

    /// Convenience for ok-status events.
    pub fn log_ok(
        &self,
        component: &str,
        op: &str,
        duration_ms: Option<f64>,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        self.log_event(component, op, "ok", duration_ms, fields)
    }

    /// Best-effort write: failures are logged and swallowed so breakdown
    /// capture never fails the primary call it is attached to.
    pub fn log_best_effort(
        &self,
        component: &str,
        op: &str,
        status: &str,
        duration_ms: Option<f64>,
        fields: serde_json::Map<String, serde_json::Value>,
    ) {
        if let Err(e) = self.log_event(component, op, status, duration_ms, fields) {
            warn!(component, op, error = %e, "Failed to write breakdown event");
        }
    }
}

/// Byte-size estimate of a JSON payload, used for params/result sizing.
pub fn estimate_size_bytes(payload: &serde_json::Value) -> usize {
    serde_json::to_string(payload)
        .map(|s| s.len())
        .unwrap_or(0)
}

/// Build a field map from `(key, value)` pairs.
#[macro_export]
macro_rules! event_fields {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::serde_json::Map::new();
        $(map.insert($key.to_string(), $crate::serde_json::json!($value));)*
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn events_carry_shared_context_and_fields() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("breakdown.jsonl");

        let context = crate::event_fields! {
            "run_id" => "run-1",
            "dataset" => "corpus50",
        };
        let logger = BreakdownLogger::create(&path, context)?;
        logger.log_ok(
            "graph",
            "cypher_query",
            Some(12.3456),
            crate::event_fields! { "query_tag" => "read", "records_count" => 3 },
        )?;
        logger.log_event(
            "collector",
            "start",
            "ok",
            None,
            serde_json::Map::new(),
        )?;

        let lines: Vec<String> = std::fs::read_to_string(&path)?
            .lines()
            .map(String::from)
            .collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(&lines[0])?;
        assert_eq!(first["component"], "graph");
        assert_eq!(first["op"], "cypher_query");
        assert_eq!(first["status"], "ok");
        assert_eq!(first["run_id"], "run-1");
        assert_eq!(first["dataset"], "corpus50");
        assert_eq!(first["records_count"], 3);
        // duration rounded to 3 decimals
        assert!((first["duration_ms"].as_f64().unwrap() - 12.346).abs() < 1e-9);

        let second: serde_json::Value = serde_json::from_str(&lines[1])?;
        assert!(second.get("duration_ms").is_none());
        Ok(())
    }

    #[test]
    fn size_estimate_tracks_serialized_length() {
        let v = serde_json::json!({"a": 1});
        assert_eq!(estimate_size_bytes(&v), "{\"a\":1}".len());
    }
}
