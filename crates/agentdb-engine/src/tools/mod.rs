pub mod awaken;
pub mod buffer;
pub mod memory;
pub mod skill;
pub mod system_prompt;
pub mod todo;
pub mod tool_call;

use std::sync::Arc;

use agentdb_core::{ToolContext, ToolError};
use agentdb_store::{AgentStore, AgentStores};
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::ToolRegistry;

/// Create a ToolRegistry with every agent tool. Unlogged tools are
/// registered like the rest; the registry decides what to wrap.
pub fn create_default_registry(stores: Arc<AgentStores>) -> ToolRegistry {
    let mut registry = ToolRegistry::new(Arc::clone(&stores));

    // Awakening and system prompt
    registry.register(Arc::new(awaken::AwakenTool::new(stores.clone())));
    registry.register(Arc::new(system_prompt::UpdateSystemPromptTool::new(stores.clone())));
    registry.register(Arc::new(system_prompt::GetSystemPromptTool::new(stores.clone())));

    // Todos
    registry.register(Arc::new(todo::AddTodoTool::new(stores.clone())));
    registry.register(Arc::new(todo::ListTodosTool::new(stores.clone())));
    registry.register(Arc::new(todo::UpdateTodoTool::new(stores.clone())));
    registry.register(Arc::new(todo::CompleteTodoTool::new(stores.clone())));

    // Memories
    registry.register(Arc::new(memory::RememberTool::new(stores.clone())));
    registry.register(Arc::new(memory::UpdateMemoryTool::new(stores.clone())));
    registry.register(Arc::new(memory::SearchMemoriesTool::new(stores.clone())));
    registry.register(Arc::new(memory::GetMemoryTool::new(stores.clone())));

    // Skills
    registry.register(Arc::new(skill::AddSkillTool::new(stores.clone())));
    registry.register(Arc::new(skill::GetSkillCatalogTool::new(stores.clone())));
    registry.register(Arc::new(skill::LoadSkillTool::new(stores.clone())));

    // Buffers
    registry.register(Arc::new(buffer::StoreBufferTool::new(stores.clone())));
    registry.register(Arc::new(buffer::LoadBufferTool::new(stores.clone())));
    registry.register(Arc::new(buffer::ListBuffersTool::new(stores.clone())));

    // Call log
    registry.register(Arc::new(tool_call::LogToolCallTool::new(stores.clone())));
    registry.register(Arc::new(tool_call::ListToolCallsTool::new(stores.clone())));
    registry.register(Arc::new(tool_call::GetToolStatsTool::new(stores)));

    registry
}

/// Resolve the calling agent's store, creating it on first use.
pub(crate) fn open_store(stores: &AgentStores, ctx: &ToolContext) -> Result<AgentStore, ToolError> {
    Ok(stores.get_or_open(&ctx.agent_id)?)
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::ExecutionFailed(format!("failed to serialize result: {e}")))
}

/// Object schema with `agent_id` always required.
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    let mut props = json!({
        "agent_id": {
            "type": "string",
            "description": "Agent identifier ([A-Za-z0-9_-]+)"
        }
    });
    if let (Some(target), Value::Object(extra)) = (props.as_object_mut(), properties) {
        target.extend(extra);
    }
    let mut req = vec!["agent_id"];
    req.extend_from_slice(required);
    json!({
        "type": "object",
        "required": req,
        "properties": props,
    })
}

/// Clamp an optional caller limit into `1..=max`.
pub(crate) fn clamp_limit(raw: Option<i64>, default: u32, max: u32) -> u32 {
    match raw {
        None => default,
        Some(n) => n.clamp(1, i64::from(max)) as u32,
    }
}
