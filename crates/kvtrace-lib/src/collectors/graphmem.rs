//! Graph-memory driver: the three-call-per-item shape.
//!
//! Per item: entity extraction, relation extraction, and a memory-pruning
//! decision, each as a forced tool call, followed by graph writes for the
//! extracted relations. Extraction output that fails to parse skips the
//! writes for that item but keeps the trace records.

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::graph::QueryExecutor;
use crate::llm::{ChatMessage, ChatRequest, ChatResponse, CompletionCaller};

use super::{CellRuntime, CollectRequest};

const ENTITY_PROMPT: &str = "You are an entity extractor for a personal memory graph. \
    Call extract_entities with every entity mentioned in the user text.";

const RELATION_PROMPT: &str = "You are a relation extractor for a personal memory graph. \
    Call establish_relations with (source, relationship, target) triples \
    connecting the entities in the user text.";

const PRUNE_PROMPT: &str = "You decide which stored memories an incoming fact \
    supersedes. Call prune_memories with the list of memory ids to delete, \
    or an empty list.";

fn tool_request(model: &str, system: &str, text: &str, tool: serde_json::Value) -> ChatRequest {
    let mut request = ChatRequest::new(
        model,
        vec![ChatMessage::system(system), ChatMessage::user(text)],
    );
    request.tools = Some(serde_json::json!([tool]));
    request
}

fn entity_tool() -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": "extract_entities",
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
                            }
                        }
                    }
                }
            }
        }
    })
}

fn relation_tool() -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": "establish_relations",
            "parameters": {
                "type": "object",
                "properties": {
                    "entities": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "source": {"type": "string"},
                                "relationship": {"type": "string"},
                                "target": {"type": "string"}
                            }
                        }
                    }
                }
            }
        }
    })
}

fn prune_tool() -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": "prune_memories",
            "parameters": {
                "type": "object",
                "properties": {
                    "memory_ids": {"type": "array", "items": {"type": "string"}}
                }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct RelationTriple {
    source: String,
    relationship: String,
    target: String,
}

#[derive(Debug, Deserialize)]
struct RelationArguments {
    #[serde(default)]
    entities: Vec<RelationTriple>,
}

/// Triples from the first tool call's arguments, or empty when the model
/// answered in prose or with arguments that do not parse.
fn parse_relations(response: &ChatResponse) -> Vec<RelationTriple> {
    let Some(choice) = response.first_choice() else {
        return Vec::new();
    };
    let Some(tool_calls) = &choice.message.tool_calls else {
        return Vec::new();
    };
    let Some(first) = tool_calls.first() else {
        return Vec::new();
    };
    serde_json::from_str::<RelationArguments>(&first.function.arguments)
        .map(|args| args.entities)
        .unwrap_or_default()
}

async fn write_relations(
    executor: &dyn QueryExecutor,
    user_id: &str,
    relations: &[RelationTriple],
) -> Result<()> {
    for triple in relations {
        executor
            .execute(
                "MERGE (s:Entity {name: $source, user_id: $user_id}) \
                 MERGE (t:Entity {name: $target, user_id: $user_id}) \
                 MERGE (s)-[r:RELATES {name: $relationship}]->(t) \
                 SET r.updated_at = timestamp()",
                serde_json::json!({
                    "source": triple.source,
                    "target": triple.target,
                    "relationship": triple.relationship,
                    "user_id": user_id,
                }),
            )
            .await?;
    }
    Ok(())
}

pub(super) async fn run(runtime: &CellRuntime, request: &CollectRequest<'_>) -> Result<()> {
    let executor = runtime.graph_executor(request.config);
    let user_id = format!("trace_{}", request.dataset);
    let model = &request.config.llm_model;

    for (i, text) in request.rows.iter().enumerate() {
        debug!(item = i + 1, total = request.rows.len(), "Collecting item");

        if let Err(e) = runtime
            .caller
            .complete(tool_request(model, ENTITY_PROMPT, text, entity_tool()))
            .await
        {
            warn!(item = i + 1, error = %e, "Entity extraction failed, skipping item");
            continue;
        }

        let relations = match runtime
            .caller
            .complete(tool_request(model, RELATION_PROMPT, text, relation_tool()))
            .await
        {
            Ok(response) => parse_relations(&response),
            Err(e) => {
                warn!(item = i + 1, error = %e, "Relation extraction failed, skipping item");
                continue;
            }
        };

        if let Err(e) = runtime
            .caller
            .complete(tool_request(model, PRUNE_PROMPT, text, prune_tool()))
            .await
        {
            warn!(item = i + 1, error = %e, "Prune decision failed, continuing");
        }

        if let Err(e) = write_relations(executor.as_ref(), &user_id, &relations).await {
            warn!(item = i + 1, error = %e, "Graph write failed, continuing");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Choice, ResponseMessage, ToolCall, ToolFunction};

    fn tool_response(name: &str, arguments: &str) -> ChatResponse {
        ChatResponse {
            model: None,
            choices: vec![Choice {
                message: ResponseMessage {
                    content: None,
                    tool_calls: Some(vec![ToolCall {
                        function: ToolFunction {
                            name: name.to_string(),
                            arguments: arguments.to_string(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: None,
        }
    }

    #[test]
    fn relations_parse_from_tool_arguments() {
        let response = tool_response(
            "establish_relations",
            "{\"entities\": [{\"source\": \"tokyo\", \"relationship\": \"capital_of\", \"target\": \"japan\"}]}",
        );
        let relations = parse_relations(&response);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].source, "tokyo");
        assert_eq!(relations[0].relationship, "capital_of");
        assert_eq!(relations[0].target, "japan");
    }

    #[test]
    fn unparseable_arguments_yield_no_relations() {
        let response = tool_response("establish_relations", "not json");
        assert!(parse_relations(&response).is_empty());
    }
}
