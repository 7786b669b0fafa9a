//! Baseline driver: one JSON-mode extraction completion per item.

use anyhow::Result;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, ChatRequest, CompletionCaller};

use super::{CellRuntime, CollectRequest};

const SYSTEM_PROMPT: &str = "You are a factual extraction assistant. \
    Return compact JSON with keys: summary, entities, relations.";

const MAX_OUTPUT_TOKENS: u32 = 400;

fn build_request(model: &str, text: &str) -> ChatRequest {
    let mut request = ChatRequest::new(
        model,
        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(text)],
    );
    request.max_tokens = Some(MAX_OUTPUT_TOKENS);
    request.response_format = Some(serde_json::json!({"type": "json_object"}));
    request
}

pub(super) async fn run(runtime: &CellRuntime, request: &CollectRequest<'_>) -> Result<()> {
    for (i, text) in request.rows.iter().enumerate() {
        debug!(item = i + 1, total = request.rows.len(), "Collecting item");
        if let Err(e) = runtime
            .caller
            .complete(build_request(&request.config.llm_model, text))
            .await
        {
            warn!(item = i + 1, error = %e, "Baseline call failed, skipping item");
        }
    }
    Ok(())
}
