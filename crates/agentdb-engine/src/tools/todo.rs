use std::sync::Arc;

use agentdb_core::tools::parse_args;
use agentdb_core::{Tool, ToolContext, ToolError};
use agentdb_store::row_helpers::parse_input;
use agentdb_store::todos::{Priority, TodoStatus, TodoUpdate};
use agentdb_store::AgentStores;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{object_schema, open_store, to_json};

fn status_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["pending", "in_progress", "done"]
    })
}

// --- add_todo ---

pub struct AddTodoTool {
    stores: Arc<AgentStores>,
}

impl AddTodoTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct AddArgs {
    content: String,
    priority: Option<i64>,
}

#[async_trait]
impl Tool for AddTodoTool {
    fn name(&self) -> &str {
        "add_todo"
    }

    fn description(&self) -> &str {
        "Add a pending todo with a priority from 1 (lowest) to 10 (highest)"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "content": {"type": "string", "description": "What needs doing"},
                "priority": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 10,
                    "description": "Defaults to 5"
                }
            }),
            &["content"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: AddArgs = parse_args(&args)?;
        let priority = match args.priority {
            Some(raw) => Priority::new(raw)?,
            None => Priority::DEFAULT,
        };
        let row = open_store(&self.stores, ctx)?
            .todos()
            .add(&args.content, priority)?;
        Ok(json!({ "todo_id": row.id }))
    }
}

// --- list_todos ---

pub struct ListTodosTool {
    stores: Arc<AgentStores>,
}

impl ListTodosTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct ListArgs {
    status: Option<String>,
}

#[async_trait]
impl Tool for ListTodosTool {
    fn name(&self) -> &str {
        "list_todos"
    }

    fn description(&self) -> &str {
        "List todos by priority, optionally filtered by status"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({ "status": status_schema() }), &[])
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: ListArgs = parse_args(&args)?;
        let status = args
            .status
            .as_deref()
            .map(|s| parse_input::<TodoStatus>(s, "status"))
            .transpose()?;
        let rows = open_store(&self.stores, ctx)?.todos().list(status)?;
        to_json(&rows)
    }
}

// --- update_todo ---

pub struct UpdateTodoTool {
    stores: Arc<AgentStores>,
}

impl UpdateTodoTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct UpdateArgs {
    todo_id: i64,
    status: Option<String>,
    priority: Option<i64>,
}

#[async_trait]
impl Tool for UpdateTodoTool {
    fn name(&self) -> &str {
        "update_todo"
    }

    fn description(&self) -> &str {
        "Change a todo's status or priority"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "todo_id": {"type": "integer"},
                "status": status_schema(),
                "priority": {"type": "integer", "minimum": 1, "maximum": 10}
            }),
            &["todo_id"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: UpdateArgs = parse_args(&args)?;
        let update = TodoUpdate {
            status: args
                .status
                .as_deref()
                .map(|s| parse_input::<TodoStatus>(s, "status"))
                .transpose()?,
            priority: args.priority.map(Priority::new).transpose()?,
        };
        let row = open_store(&self.stores, ctx)?
            .todos()
            .update(args.todo_id, update)?;
        to_json(&row)
    }
}

// --- complete_todo ---

pub struct CompleteTodoTool {
    stores: Arc<AgentStores>,
}

impl CompleteTodoTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct CompleteArgs {
    todo_id: i64,
}

#[async_trait]
impl Tool for CompleteTodoTool {
    fn name(&self) -> &str {
        "complete_todo"
    }

    fn description(&self) -> &str {
        "Mark a todo as done"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({ "todo_id": {"type": "integer"} }), &["todo_id"])
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: CompleteArgs = parse_args(&args)?;
        let row = open_store(&self.stores, ctx)?
            .todos()
            .complete(args.todo_id)?;
        Ok(json!({ "success": true, "todo_id": row.id }))
    }
}
