//! Endpoint preflight: verify the configured endpoint handles the three
//! request shapes the collectors issue (plain completion, tool calling,
//! JSON mode) before a collection run spends time on it.

use serde_json::json;
use tracing::info;

use kvtrace_lib::llm::{ChatClient, ChatMessage, ChatRequest, CompletionCaller};
use kvtrace_lib::Config;

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub label: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Masked rendition of a secret for banner output.
fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        return "(not set)".to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        let head: String = chars.iter().take(2).collect();
        format!("{head}***")
    } else {
        let head: String = chars.iter().take(8).collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

async fn check_chat_completions(caller: &dyn CompletionCaller, model: &str) -> CheckResult {
    let mut request = ChatRequest::new(
        model,
        vec![ChatMessage::user("Say 'hello' and nothing else.")],
    );
    request.max_tokens = Some(10);

    match caller.complete(request).await {
        Ok(response) => {
            let text = response
                .first_choice()
                .and_then(|c| c.message.content.clone())
                .unwrap_or_default();
            CheckResult {
                label: "chat completions",
                passed: true,
                detail: format!("response: {text:?}"),
            }
        }
        Err(e) => CheckResult {
            label: "chat completions",
            passed: false,
            detail: e.to_string(),
        },
    }
}

/// Tool calling is only needed by the graph-memory scaffold; a model that
/// answers in plain content instead of a tool call is reported but not
/// treated as a failure.
async fn check_tool_calling(caller: &dyn CompletionCaller, model: &str) -> CheckResult {
    let mut request = ChatRequest::new(
        model,
        vec![ChatMessage::user("Marie Curie was a physicist.")],
    );
    request.max_tokens = Some(200);
    request.tools = Some(json!([{
        "type": "function",
        "function": {
            "name": "extract_entities",
            "description": "Extract entities from text.",
            "parameters": {
                "type": "object",
                "properties": {
                    "entities": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "entity": {"type": "string"},
                                "entity_type": {"type": "string"}
                            },
                            "required": ["entity", "entity_type"]
                        }
                    }
                },
                "required": ["entities"]
            }
        }
    }]));

    match caller.complete(request).await {
        Ok(response) => {
            let message = response.first_choice().map(|c| &c.message);
            let tool_name = message
                .and_then(|m| m.tool_calls.as_ref())
                .and_then(|calls| calls.first())
                .map(|call| call.function.name.clone());
            let detail = match (tool_name, message.and_then(|m| m.content.clone())) {
                (Some(name), _) => format!("tool_calls: {name}"),
                (None, Some(content)) if !content.is_empty() => {
                    let preview: String = content.chars().take(80).collect();
                    format!("no tool_calls, got content instead: {preview:?}")
                }
                _ => "empty response".to_string(),
            };
            CheckResult {
                label: "tool calling",
                passed: true,
                detail,
            }
        }
        Err(e) => CheckResult {
            label: "tool calling",
            passed: false,
            detail: e.to_string(),
        },
    }
}

async fn check_json_mode(caller: &dyn CompletionCaller, model: &str) -> CheckResult {
    let mut request = ChatRequest::new(
        model,
        vec![
            ChatMessage::system("You are a helpful assistant that responds in JSON format."),
            ChatMessage::user("Return a JSON object with key \"status\" and value \"ok\"."),
        ],
    );
    request.max_tokens = Some(50);
    request.response_format = Some(json!({"type": "json_object"}));

    match caller.complete(request).await {
        Ok(response) => {
            let text = response
                .first_choice()
                .and_then(|c| c.message.content.clone())
                .unwrap_or_default();
            CheckResult {
                label: "JSON mode",
                passed: true,
                detail: format!("response: {text:?}"),
            }
        }
        Err(e) => CheckResult {
            label: "JSON mode",
            passed: false,
            detail: e.to_string(),
        },
    }
}

/// Probe the configured endpoint with all three request shapes.
pub async fn run_preflight(config: &Config) -> Vec<CheckResult> {
    println!("Endpoint: {}", config.llm_api_base);
    println!("Model:    {}", config.llm_model);
    println!("API Key:  {}", mask_secret(&config.llm_api_key));
    println!();

    let client = ChatClient::new(config);
    let model = config.llm_model.as_str();
    let checks = [
        check_chat_completions(&client, model).await,
        check_tool_calling(&client, model).await,
        check_json_mode(&client, model).await,
    ];

    for (i, check) in checks.iter().enumerate() {
        let verdict = if check.passed { "OK" } else { "FAIL" };
        println!(
            "[{}/{}] Testing {}... {verdict}  ({})",
            i + 1,
            checks.len(),
            check.label,
            check.detail
        );
    }
    info!(
        passed = checks.iter().filter(|c| c.passed).count(),
        total = checks.len(),
        "Endpoint preflight finished"
    );
    checks.to_vec()
}

pub fn print_preflight_summary(results: &[CheckResult]) {
    println!();
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed == 0 {
        println!("All checks passed. Endpoint is ready for trace collection.");
    } else {
        println!("{failed}/{} checks failed. Some collectors may not work.", results.len());
    }
}

pub fn any_check_failed(results: &[CheckResult]) -> bool {
    results.iter().any(|r| !r.passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kvtrace_lib::llm::ChatResponse;

    struct StubCaller {
        body: serde_json::Value,
        fail: bool,
    }

    #[async_trait]
    impl CompletionCaller for StubCaller {
        async fn complete(&self, _request: ChatRequest) -> anyhow::Result<ChatResponse> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(serde_json::from_value(self.body.clone())?)
        }
    }

    #[test]
    fn secrets_are_masked_for_the_banner() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("short"), "sh***");
        assert_eq!(mask_secret("sk-abcdefgh1234wxyz"), "sk-abcde...wxyz");
    }

    #[tokio::test]
    async fn tool_check_reports_the_called_tool() {
        let caller = StubCaller {
            body: serde_json::json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{"function": {"name": "extract_entities", "arguments": "{}"}}]
                    }
                }]
            }),
            fail: false,
        };
        let result = check_tool_calling(&caller, "test-model").await;
        assert!(result.passed);
        assert!(result.detail.contains("extract_entities"));
    }

    #[tokio::test]
    async fn tool_check_tolerates_content_only_replies() {
        let caller = StubCaller {
            body: serde_json::json!({
                "choices": [{"message": {"content": "Marie Curie is an entity."}}]
            }),
            fail: false,
        };
        let result = check_tool_calling(&caller, "test-model").await;
        assert!(result.passed);
        assert!(result.detail.contains("no tool_calls"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_the_checks() {
        let caller = StubCaller {
            body: serde_json::Value::Null,
            fail: true,
        };
        let chat = check_chat_completions(&caller, "test-model").await;
        let json_mode = check_json_mode(&caller, "test-model").await;
        assert!(!chat.passed);
        assert!(!json_mode.passed);
        assert!(any_check_failed(&[chat, json_mode]));
    }
}
