//! Core library for the kvtrace collection matrix: capture every language
//! model call a memory scaffold makes, log the surrounding workload
//! (graph queries, episodes, snapshots), and aggregate match files from
//! the external token-reuse analyzer into a comparable report.
//!
//! The capture seams are traits (`CompletionCaller`, `QueryExecutor`)
//! substituted per run; nothing is patched globally.

// Re-exported for the `event_fields!` expansion.
#[doc(hidden)]
pub use serde_json;

pub mod analysis;
pub mod breakdown;
pub mod collectors;
pub mod config;
pub mod corpus;
pub mod cypher;
pub mod datasets;
pub mod error;
pub mod graph;
pub mod intercept;
pub mod llm;
pub mod paths;
pub mod trace;

pub use breakdown::{BreakdownEvent, BreakdownLogger};
pub use config::Config;
pub use error::{TraceError, TraceResult};
pub use intercept::TracingCaller;
pub use llm::{ChatClient, ChatRequest, ChatResponse, CompletionCaller};
pub use trace::{TraceLogger, TraceRecord};
