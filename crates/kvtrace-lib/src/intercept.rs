//! Interception layer for chat completion calls.
//!
//! `TracingCaller` wraps any `CompletionCaller` and records exactly one
//! trace record (and optionally one breakdown event) per call, without
//! changing the request or the returned response. Errors from the inner
//! caller propagate unchanged; errors from the trace write itself also
//! propagate, because trace integrity outranks workload completion.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::breakdown::{BreakdownLogger, PREVIEW_CHARS};
use crate::cypher::cypher_hash;
use crate::event_fields;
use crate::llm::{ChatRequest, ChatResponse, CompletionCaller};
use crate::trace::{flatten_messages, TraceLogger};

/// Extract the trace `output` text from a response: plain content, or the
/// serialized name+arguments of the first tool call when the model chose
/// one. Only the first invocation is recorded when several are returned;
/// its name is surfaced as the call classification tag.
pub fn response_output_text(response: &ChatResponse) -> (String, Option<String>) {
    let Some(choice) = response.first_choice() else {
        return (String::new(), None);
    };
    if let Some(tool_calls) = &choice.message.tool_calls {
        if let Some(first) = tool_calls.first() {
            let serialized = serde_json::json!({
                "name": first.function.name,
                "arguments": first.function.arguments,
            })
            .to_string();
            return (serialized, Some(first.function.name.clone()));
        }
    }
    (
        choice.message.content.clone().unwrap_or_default(),
        None,
    )
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Tracing wrapper around a completion caller.
pub struct TracingCaller<C: CompletionCaller> {
    inner: C,
    trace_logger: Arc<TraceLogger>,
    breakdown_logger: Option<Arc<BreakdownLogger>>,
}

impl<C: CompletionCaller> TracingCaller<C> {
    pub fn new(
        inner: C,
        trace_logger: Arc<TraceLogger>,
        breakdown_logger: Option<Arc<BreakdownLogger>>,
    ) -> Self {
        Self {
            inner,
            trace_logger,
            breakdown_logger,
        }
    }
}

#[async_trait]
impl<C: CompletionCaller> CompletionCaller for TracingCaller<C> {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        // Flatten before the call so the record reflects what was sent.
        let input_text = flatten_messages(&request.messages);

        let started = Instant::now();
        let result = self.inner.complete(request).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if let Some(breakdown) = &self.breakdown_logger {
                    breakdown.log_best_effort(
                        "llm",
                        "chat_completion",
                        "error",
                        Some(latency_ms),
                        event_fields! {
                            "prompt_hash" => cypher_hash(&input_text),
                            "prompt_size_chars" => input_text.chars().count(),
                            "error" => e.to_string(),
                        },
                    );
                }
                return Err(e);
            }
        };

        let (output_text, call_type) = response_output_text(&response);

        let mut metadata = serde_json::Map::new();
        if let Some(model) = &response.model {
            metadata.insert("model".to_string(), model.clone().into());
        }
        if let Some(choice) = response.first_choice() {
            if let Some(finish_reason) = &choice.finish_reason {
                metadata.insert("finish_reason".to_string(), finish_reason.clone().into());
            }
        }
        if let Some(call_type) = &call_type {
            metadata.insert("call_type".to_string(), call_type.clone().into());
        }
        metadata.insert(
            "latency_ms".to_string(),
            serde_json::json!(latency_ms.round()),
        );
        if let Some(usage) = &response.usage {
            if let Some(v) = usage.prompt_tokens {
                metadata.insert("prompt_tokens".to_string(), v.into());
            }
            if let Some(v) = usage.completion_tokens {
                metadata.insert("completion_tokens".to_string(), v.into());
            }
            if let Some(v) = usage.total_tokens {
                metadata.insert("total_tokens".to_string(), v.into());
            }
            if let Some(details) = &usage.prompt_tokens_details {
                metadata.insert(
                    "cached_tokens".to_string(),
                    details.cached_tokens.unwrap_or(0).into(),
                );
            }
        }

        self.trace_logger
            .log(input_text.clone(), output_text.clone(), metadata.clone())?;

        if let Some(breakdown) = &self.breakdown_logger {
            breakdown.log_best_effort(
                "llm",
                "chat_completion",
                "ok",
                Some(latency_ms),
                event_fields! {
                    "prompt_hash" => cypher_hash(&input_text),
                    "prompt_preview" => truncate_chars(&input_text, PREVIEW_CHARS),
                    "prompt_size_chars" => input_text.chars().count(),
                    "output_size_chars" => output_text.chars().count(),
                    "prompt_tokens" => metadata.get("prompt_tokens"),
                    "completion_tokens" => metadata.get("completion_tokens"),
                    "total_tokens" => metadata.get("total_tokens"),
                    "cached_tokens" => metadata.get("cached_tokens"),
                },
            );
        }

        Ok(response)
    }
}
