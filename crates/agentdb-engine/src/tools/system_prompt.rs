use std::sync::Arc;

use agentdb_core::tools::parse_args;
use agentdb_core::{Tool, ToolContext, ToolError};
use agentdb_store::AgentStores;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{object_schema, open_store};

pub struct UpdateSystemPromptTool {
    stores: Arc<AgentStores>,
}

impl UpdateSystemPromptTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct UpdateArgs {
    content: String,
}

#[async_trait]
impl Tool for UpdateSystemPromptTool {
    fn name(&self) -> &str {
        "update_system_prompt"
    }

    fn description(&self) -> &str {
        "Replace the agent's system prompt with a new version; older versions become inactive"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "content": {"type": "string", "description": "Full prompt text"}
            }),
            &["content"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: UpdateArgs = parse_args(&args)?;
        let row = open_store(&self.stores, ctx)?.prompts().update(&args.content)?;
        Ok(json!({ "version": row.version }))
    }
}

pub struct GetSystemPromptTool {
    stores: Arc<AgentStores>,
}

impl GetSystemPromptTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[async_trait]
impl Tool for GetSystemPromptTool {
    fn name(&self) -> &str {
        "get_system_prompt"
    }

    fn description(&self) -> &str {
        "Get the agent's active system prompt"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({}), &[])
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        match open_store(&self.stores, ctx)?.prompts().active()? {
            Some(row) => Ok(json!({
                "id": row.id,
                "content": row.content,
                "version": row.version,
                "created_at": row.created_at,
            })),
            None => Err(ToolError::NotFound("no system prompt set".into())),
        }
    }
}
