//! Benchmark-agent driver: multi-turn agent/user-simulator conversations.
//!
//! Each dataset row is one task. The user simulator and the agent are the
//! same model behind the same tracing caller, alternating turns until the
//! simulator emits the stop marker or the turn cap is reached.
//! Concurrency is fixed at one so trace ordering follows the conversation.

use anyhow::Result;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, ChatRequest, ChatResponse, CompletionCaller};

use super::{CellRuntime, CollectRequest};

/// Marker the user simulator is instructed to emit when the task is done.
pub const STOP_MARKER: &str = "###STOP###";

const MAX_TURNS: usize = 6;

const AGENT_PROMPT: &str = "You are a customer service agent. Resolve the \
    user's request step by step, asking for missing details when needed.";

fn user_sim_prompt(task_text: &str) -> String {
    format!(
        "You simulate a customer with the task below. Speak only as the \
         customer, one message at a time. When the task is fully resolved, \
         reply with exactly {STOP_MARKER}.\n\n{task_text}"
    )
}

fn response_text(response: &ChatResponse) -> String {
    response
        .first_choice()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default()
}

/// One conversation. Returns the number of completed turns.
async fn run_conversation(
    runtime: &CellRuntime,
    model: &str,
    task_text: &str,
) -> Result<usize> {
    // Two parallel transcripts: each side sees itself as the assistant.
    let mut agent_messages = vec![ChatMessage::system(AGENT_PROMPT)];
    let mut user_messages = vec![ChatMessage::system(user_sim_prompt(task_text))];
    user_messages.push(ChatMessage::user(
        "The conversation starts now. Send your first message.",
    ));

    for turn in 0..MAX_TURNS {
        let user_reply = response_text(
            &runtime
                .caller
                .complete(ChatRequest::new(model, user_messages.clone()))
                .await?,
        );
        if user_reply.trim().is_empty() || user_reply.contains(STOP_MARKER) {
            return Ok(turn);
        }
        user_messages.push(ChatMessage::assistant(&user_reply));
        agent_messages.push(ChatMessage::user(&user_reply));

        let agent_reply = response_text(
            &runtime
                .caller
                .complete(ChatRequest::new(model, agent_messages.clone()))
                .await?,
        );
        agent_messages.push(ChatMessage::assistant(&agent_reply));
        user_messages.push(ChatMessage::user(&agent_reply));
    }
    Ok(MAX_TURNS)
}

pub(super) async fn run(runtime: &CellRuntime, request: &CollectRequest<'_>) -> Result<()> {
    let model = &request.config.llm_model;
    for (i, task_text) in request.rows.iter().enumerate() {
        debug!(task = i + 1, total = request.rows.len(), "Running task");
        match run_conversation(runtime, model, task_text).await {
            Ok(turns) => debug!(task = i + 1, turns, "Task finished"),
            Err(e) => warn!(task = i + 1, error = %e, "Task failed, skipping"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_sim_prompt_embeds_task_and_stop_marker() {
        let prompt = user_sim_prompt("[task_id]\nt1");
        assert!(prompt.contains("[task_id]\nt1"));
        assert!(prompt.contains(STOP_MARKER));
    }
}
