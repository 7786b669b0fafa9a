//! Workload drivers: one per scaffold shape in the collection matrix.
//!
//! A driver reproduces a scaffold's outbound-call pattern (completions,
//! graph queries) against the real endpoints, with every completion routed
//! through a `TracingCaller` and every graph query through an
//! `InstrumentedExecutor` when breakdown capture is on. Drivers are
//! sequential: one trace-file writer, one item at a time, transient item
//! failures logged and skipped.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::breakdown::BreakdownLogger;
use crate::config::Config;
use crate::error::{TraceError, TraceResult};
use crate::graph::{GraphClient, InstrumentedExecutor, QueryExecutor};
use crate::intercept::TracingCaller;
use crate::llm::ChatClient;
use crate::paths::matrix_key;
use crate::trace::TraceLogger;

pub mod baseline;
pub mod bench;
pub mod graphmem;
pub mod temporal;

pub const SCAFFOLD_CHOICES: [&str; 4] = ["baseline", "graphmem", "temporal", "bench_agent"];

pub fn scaffold_description(scaffold: &str) -> &str {
    match scaffold {
        "baseline" => "Direct JSON-mode extraction completions, no memory scaffold",
        "graphmem" => "Graph-memory shape: three tool calls per item plus graph writes",
        "temporal" => "Temporal knowledge-graph shape: episode pipeline with graph queries",
        "bench_agent" => "Benchmark agent shape: multi-turn agent/user-simulator conversations",
        other => other,
    }
}

/// Everything a driver needs for one matrix cell.
pub struct CollectRequest<'a> {
    pub config: &'a Config,
    pub dataset: &'a str,
    pub rows: &'a [String],
    pub trace_path: &'a Path,
    pub breakdown_path: Option<&'a Path>,
    pub breakdown_context: serde_json::Map<String, serde_json::Value>,
}

/// Shared per-cell wiring handed to the scaffold drivers.
pub(crate) struct CellRuntime {
    pub caller: TracingCaller<ChatClient>,
    pub breakdown: Option<Arc<BreakdownLogger>>,
    pub trace_path: PathBuf,
}

impl CellRuntime {
    fn build(scaffold: &str, request: &CollectRequest<'_>) -> Result<Self> {
        let session_id = matrix_key(scaffold, request.dataset);
        let trace_logger = Arc::new(TraceLogger::create(request.trace_path, &session_id)?);

        let breakdown = match request.breakdown_path {
            Some(path) => {
                let mut context = request.breakdown_context.clone();
                context.insert("session_id".to_string(), session_id.clone().into());
                context.insert("collector".to_string(), scaffold.to_string().into());
                // Standalone runs outside the matrix still get a run id.
                context
                    .entry("run_id".to_string())
                    .or_insert_with(|| uuid::Uuid::new_v4().to_string().into());
                Some(Arc::new(BreakdownLogger::create(path, context)?))
            }
            None => None,
        };

        let caller = TracingCaller::new(
            ChatClient::new(request.config),
            trace_logger,
            breakdown.clone(),
        );

        Ok(Self {
            caller,
            breakdown,
            trace_path: request.trace_path.to_path_buf(),
        })
    }

    /// Graph executor for this cell, instrumented when breakdown is on.
    pub fn graph_executor(&self, config: &Config) -> Box<dyn QueryExecutor> {
        let client = GraphClient::new(config);
        match &self.breakdown {
            Some(logger) => Box::new(InstrumentedExecutor::new(client, logger.clone())),
            None => Box::new(client),
        }
    }
}

/// Run one matrix cell. Returns the trace path on success.
pub async fn collect(scaffold: &str, request: CollectRequest<'_>) -> Result<PathBuf> {
    if !SCAFFOLD_CHOICES.contains(&scaffold) {
        return Err(TraceError::UnknownScaffold(scaffold.to_string()).into());
    }
    request.config.ensure_llm_credentials()?;

    let runtime = CellRuntime::build(scaffold, &request)?;
    info!(
        scaffold,
        dataset = request.dataset,
        items = request.rows.len(),
        "Starting collection"
    );

    match scaffold {
        "baseline" => baseline::run(&runtime, &request).await?,
        "graphmem" => graphmem::run(&runtime, &request).await?,
        "temporal" => temporal::run(&runtime, &request).await?,
        "bench_agent" => bench::run(&runtime, &request).await?,
        other => return Err(TraceError::UnknownScaffold(other.to_string()).into()),
    }

    info!(
        scaffold,
        trace_file = %runtime.trace_path.display(),
        "Collection finished"
    );
    Ok(runtime.trace_path)
}

/// Validate a scaffold name without running anything.
pub fn ensure_known_scaffold(scaffold: &str) -> TraceResult<()> {
    if SCAFFOLD_CHOICES.contains(&scaffold) {
        Ok(())
    } else {
        Err(TraceError::UnknownScaffold(scaffold.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_names_are_validated() {
        assert!(ensure_known_scaffold("baseline").is_ok());
        assert!(ensure_known_scaffold("temporal").is_ok());
        let err = ensure_known_scaffold("mystery").unwrap_err();
        assert!(matches!(err, TraceError::UnknownScaffold(name) if name == "mystery"));
    }
}
