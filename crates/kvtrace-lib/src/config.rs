//! Environment-driven runtime configuration.
//!
//! All knobs are read once at process start. `LLM_*` variables take
//! precedence; `OPENAI_*` remain supported for existing .env files.

use std::path::PathBuf;

use crate::error::{TraceError, TraceResult};

/// Tokenizer passed to the external analyzer. Fixed so match files from
/// different runs stay comparable.
pub const ANALYSIS_TOKENIZER: &str = "meta-llama/Llama-3.1-8B";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the OpenAI-compatible chat completion endpoint.
    pub llm_api_base: String,
    /// Model name sent with every completion request.
    pub llm_model: String,
    /// API key for the completion endpoint. May be empty for local servers.
    pub llm_api_key: String,

    /// HTTP endpoint of the graph store (transaction API).
    pub graph_http_uri: String,
    pub graph_username: String,
    pub graph_password: String,
    pub graph_database: String,

    /// Root directory for trace/breakdown/match files.
    pub traces_dir: PathBuf,
    /// Directory holding benchmark task files (`{domain}.json`).
    pub tasks_dir: PathBuf,
    /// Directory holding legacy replay files (`*.jsonl`).
    pub replay_dir: PathBuf,

    /// Command used to run the external token-matching analyzer.
    pub analyzer_cmd: String,
    /// Timeout for one analyzer invocation, in seconds.
    pub analyzer_timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Read configuration from the environment (and a `.env` file if
    /// present). Called once at startup; there is no hot reload.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let openai_base = env_or("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let openai_key = env_or("OPENAI_API_KEY", "");

        Self {
            llm_api_base: env_or("LLM_API_BASE", &openai_base),
            llm_model: env_or("LLM_MODEL", "gpt-4o-mini"),
            llm_api_key: env_or("LLM_API_KEY", &openai_key),
            graph_http_uri: env_or("GRAPH_HTTP_URI", "http://localhost:7474"),
            graph_username: env_or("GRAPH_USERNAME", "neo4j"),
            graph_password: env_or("GRAPH_PASSWORD", "password"),
            graph_database: env_or("GRAPH_DATABASE", "neo4j"),
            traces_dir: PathBuf::from(env_or("KVTRACE_TRACES_DIR", "data/traces")),
            tasks_dir: PathBuf::from(env_or("KVTRACE_TASKS_DIR", "data/tasks")),
            replay_dir: PathBuf::from(env_or("KVTRACE_REPLAY_DIR", "data/replay")),
            analyzer_cmd: env_or("KVTRACE_ANALYZER", "prefix-analyzer"),
            analyzer_timeout_secs: env_or("KVTRACE_ANALYZER_TIMEOUT_SECS", "1800")
                .parse()
                .unwrap_or(1800),
        }
    }

    /// Precondition check run before any collection work begins.
    pub fn ensure_llm_credentials(&self) -> TraceResult<()> {
        if self.llm_api_base.is_empty() {
            return Err(TraceError::MissingConfig("LLM_API_BASE".to_string()));
        }
        if self.llm_model.is_empty() {
            return Err(TraceError::MissingConfig("LLM_MODEL".to_string()));
        }
        Ok(())
    }
}
