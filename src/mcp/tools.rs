//! MCP tool definitions and handlers

use super::types::{ToolDefinition, ToolResult};
use crate::config::Config;
use crate::kb::KnowledgeBase;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{error, info};

/// Name of the single tool this server exposes
pub const QUERY_TOOL: &str = "query";

/// Get all available tool definitions
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: QUERY_TOOL.to_string(),
        description: "Query the ICAET knowledge base. Ask a natural language question about ICAET conference content, speakers, topics, or sessions and get an answer drawn from the recorded talks.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "A natural language question about ICAET conference content, speakers, topics, or sessions"
                }
            },
            "required": ["question"]
        }),
    }]
}

/// Handle a tool call
pub async fn handle_tool_call(
    name: &str,
    arguments: &HashMap<String, Value>,
    kb: &dyn KnowledgeBase,
    config: &Config,
) -> ToolResult {
    match name {
        QUERY_TOOL => handle_query(arguments, kb, config).await,
        _ => ToolResult::error(format!("Unknown tool: {}", name)),
    }
}

/// Handle the query tool
async fn handle_query(
    arguments: &HashMap<String, Value>,
    kb: &dyn KnowledgeBase,
    config: &Config,
) -> ToolResult {
    let question = match arguments.get("question") {
        Some(Value::String(q)) => q,
        Some(_) => return ToolResult::error("Parameter 'question' must be a string"),
        None => return ToolResult::error("Missing required parameter: question"),
    };

    match kb.ask(question).await {
        Ok(response) => {
            info!("Query answered");
            ToolResult::text(response.render(config.response.format))
        }
        Err(e) => {
            error!(error = %e, "Query failed");
            ToolResult::error(e.user_message(config.api.auth_error_hints))
        }
    }
}
