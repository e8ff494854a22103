use std::sync::Arc;

use agentdb_core::tools::parse_args;
use agentdb_core::{Tool, ToolContext, ToolError};
use agentdb_store::AgentStores;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{object_schema, open_store, to_json};
use crate::context;

pub struct AwakenTool {
    stores: Arc<AgentStores>,
}

impl AwakenTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct Args {
    #[serde(default)]
    include_tool_history: bool,
}

#[async_trait]
impl Tool for AwakenTool {
    fn name(&self) -> &str {
        "awaken"
    }

    fn description(&self) -> &str {
        "Load the agent's layered context: system prompt, pending todos, skill catalog, \
         top memories, buffer references and optionally recent tool calls"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "include_tool_history": {
                    "type": "boolean",
                    "description": "Include the 20 most recent tool calls (default false)"
                }
            }),
            &[],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: Args = parse_args(&args)?;
        let store = open_store(&self.stores, ctx)?;
        let bundle = context::awaken(&store, args.include_tool_history)?;
        to_json(&bundle)
    }
}
