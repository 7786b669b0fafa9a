//! OpenAI-compatible chat completion types and HTTP client.
//!
//! The wire shapes cover exactly what the scaffolds produce and what the
//! interception layer reads back: messages (possibly multimodal), optional
//! response-format hints, optional tool declarations, and the response's
//! content / tool calls / usage counters.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// One content block of a multimodal message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Message content: plain text or a list of typed blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Text-only view of the content: plain text as-is, blocks reduced to
    /// their `text` parts joined by single spaces (non-text blocks dropped).
    pub fn as_flat_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.kind == "text")
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }
}

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: Some(0.0),
            max_tokens: None,
            response_format: None,
            tools: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }
}

/// The single entry point all scaffolds call completions through.
///
/// Scaffold code holds a `&dyn CompletionCaller`; the orchestrator decides
/// whether that is the bare HTTP client or a tracing wrapper around it.
#[async_trait]
pub trait CompletionCaller: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Bare HTTP client for an OpenAI-compatible endpoint.
pub struct ChatClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_base: config.llm_api_base.trim_end_matches('/').to_string(),
            api_key: config.llm_api_key.clone(),
        }
    }
}

#[async_trait]
impl CompletionCaller for ChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let mut builder = self.client.post(&url);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let response = builder
            .json(&request)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion request failed with status {status}: {error_body}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to decode chat completion response body")?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multimodal_content_flattens_to_text_parts() {
        let content = MessageContent::Blocks(vec![
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
        ]);
        assert_eq!(content.as_flat_text(), "First part. Second part.");
    }

    #[test]
    fn response_decodes_with_tool_calls() {
        let body = serde_json::json!({
            "model": "test-model",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{"function": {"name": "extract", "arguments": "{\"a\":1}"}}]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 4,
                "total_tokens": 16,
                "prompt_tokens_details": {"cached_tokens": 8}
            }
        });
        let parsed: ChatResponse = serde_json::from_value(body).unwrap();
        let choice = parsed.first_choice().unwrap();
        assert_eq!(
            choice.message.tool_calls.as_ref().unwrap()[0].function.name,
            "extract"
        );
        assert_eq!(
            parsed
                .usage
                .unwrap()
                .prompt_tokens_details
                .unwrap()
                .cached_tokens,
            Some(8)
        );
    }
}
