use thiserror::Error;

/// Errors that library callers are expected to match on.
///
/// Collection/orchestration code uses `anyhow` for context chaining; this
/// enum covers the conditions the orchestrator treats differently (unknown
/// dataset vs. dataset load failure vs. missing configuration).
#[derive(Debug, Error)]
pub enum TraceError {
    /// Dataset identifier outside the enumerated set
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    /// A known dataset whose external source could not be loaded
    #[error("dataset '{name}' load failed: {reason}")]
    DatasetLoad { name: String, reason: String },

    /// Unknown scaffold identifier
    #[error("unknown scaffold '{0}'")]
    UnknownScaffold(String),

    /// Required configuration missing at startup
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for library operations.
pub type TraceResult<T> = std::result::Result<T, TraceError>;
