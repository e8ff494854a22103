//! Call-log tools. None of these are wrapped by the interceptor, so reading
//! or writing the log never adds to it.

use std::sync::Arc;

use agentdb_core::tools::parse_args;
use agentdb_core::{Tool, ToolContext, ToolError};
use agentdb_store::row_helpers::parse_input;
use agentdb_store::tool_calls::{CallSource, CallStatus, NewToolCall};
use agentdb_store::AgentStores;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{clamp_limit, object_schema, open_store, to_json};
use crate::interceptor::{summarize_input, summarize_value};

const LIST_DEFAULT_LIMIT: u32 = 20;
const LIST_MAX_LIMIT: u32 = 100;

// --- log_tool_call ---

pub struct LogToolCallTool {
    stores: Arc<AgentStores>,
}

impl LogToolCallTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct LogArgs {
    tool_name: String,
    status: Option<String>,
    #[serde(default)]
    input_params: Value,
    #[serde(default)]
    output_result: Value,
    duration_ms: Option<i64>,
}

#[async_trait]
impl Tool for LogToolCallTool {
    fn name(&self) -> &str {
        "log_tool_call"
    }

    fn description(&self) -> &str {
        "Manually record a tool call, e.g. for work done outside this server"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "tool_name": {"type": "string"},
                "status": {"type": "string", "enum": ["success", "error"]},
                "input_params": {"description": "Arguments, any JSON"},
                "output_result": {"description": "Result, any JSON"},
                "duration_ms": {"type": "integer", "minimum": 0}
            }),
            &["tool_name"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: LogArgs = parse_args(&args)?;
        let status = match args.status.as_deref() {
            Some(raw) => parse_input::<CallStatus>(raw, "status")?,
            None => CallStatus::Success,
        };
        if let Some(ms) = args.duration_ms.filter(|ms| *ms < 0) {
            return Err(ToolError::Validation {
                field: "duration_ms",
                message: format!("must not be negative, got {ms}"),
            });
        }

        let record = NewToolCall {
            tool_name: args.tool_name,
            status,
            input_summary: summarize_input(&args.input_params),
            output_summary: summarize_value(&args.output_result),
            duration_ms: args.duration_ms,
            source: CallSource::Manual,
        };
        let row = open_store(&self.stores, ctx)?.tool_calls().append(&record)?;
        Ok(json!({
            "id": row.id,
            "tool_name": row.tool_name,
            "status": row.status,
        }))
    }
}

// --- list_tool_calls ---

pub struct ListToolCallsTool {
    stores: Arc<AgentStores>,
}

impl ListToolCallsTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct ListArgs {
    tool_name: Option<String>,
    limit: Option<i64>,
}

#[async_trait]
impl Tool for ListToolCallsTool {
    fn name(&self) -> &str {
        "list_tool_calls"
    }

    fn description(&self) -> &str {
        "List recorded tool calls, newest first"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "tool_name": {"type": "string"},
                "limit": {"type": "integer", "description": "Defaults to 20, at most 100"}
            }),
            &[],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: ListArgs = parse_args(&args)?;
        let limit = clamp_limit(args.limit, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT);
        let rows = open_store(&self.stores, ctx)?
            .tool_calls()
            .list(args.tool_name.as_deref(), limit)?;
        to_json(&rows)
    }
}

// --- get_tool_stats ---

pub struct GetToolStatsTool {
    stores: Arc<AgentStores>,
}

impl GetToolStatsTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[async_trait]
impl Tool for GetToolStatsTool {
    fn name(&self) -> &str {
        "get_tool_stats"
    }

    fn description(&self) -> &str {
        "Per-tool call counts, success rate and average duration"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({}), &[])
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let stats = open_store(&self.stores, ctx)?.tool_calls().stats()?;
        to_json(&stats)
    }
}
