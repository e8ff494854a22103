use std::sync::Arc;

use agentdb_core::tools::parse_args;
use agentdb_core::{Tool, ToolContext, ToolError};
use agentdb_store::AgentStores;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{object_schema, open_store, to_json};

/// Park a large document outside the awakening context.
pub struct StoreBufferTool {
    stores: Arc<AgentStores>,
}

impl StoreBufferTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct StoreArgs {
    title: String,
    content: String,
    summary: Option<String>,
}

#[async_trait]
impl Tool for StoreBufferTool {
    fn name(&self) -> &str {
        "store_buffer"
    }

    fn description(&self) -> &str {
        "Store a large document; awakenings only show its id and title"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "title": {"type": "string"},
                "content": {"type": "string"},
                "summary": {"type": "string"}
            }),
            &["title", "content"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: StoreArgs = parse_args(&args)?;
        let row = open_store(&self.stores, ctx)?.buffers().store(
            &args.title,
            &args.content,
            args.summary.as_deref(),
        )?;
        Ok(json!({ "buffer_id": row.id }))
    }
}

pub struct LoadBufferTool {
    stores: Arc<AgentStores>,
}

impl LoadBufferTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct LoadArgs {
    buffer_id: i64,
}

#[async_trait]
impl Tool for LoadBufferTool {
    fn name(&self) -> &str {
        "load_buffer"
    }

    fn description(&self) -> &str {
        "Load a stored document in full"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({ "buffer_id": {"type": "integer"} }), &["buffer_id"])
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: LoadArgs = parse_args(&args)?;
        let row = open_store(&self.stores, ctx)?.buffers().get(args.buffer_id)?;
        to_json(&row)
    }
}

pub struct ListBuffersTool {
    stores: Arc<AgentStores>,
}

impl ListBuffersTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[async_trait]
impl Tool for ListBuffersTool {
    fn name(&self) -> &str {
        "list_buffers"
    }

    fn description(&self) -> &str {
        "List stored documents, newest first"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({}), &[])
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let listings = open_store(&self.stores, ctx)?.buffers().list()?;
        to_json(&listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ctx, stores};

    #[tokio::test]
    async fn store_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        let store = StoreBufferTool::new(stores.clone());
        let load = LoadBufferTool::new(stores.clone());
        let list = ListBuffersTool::new(stores);

        let doc = "paragraph ".repeat(500);
        let stored = store
            .execute(json!({"title": "Design notes", "content": doc}), &ctx("b"))
            .await
            .unwrap();

        let row = load
            .execute(json!({"buffer_id": stored["buffer_id"]}), &ctx("b"))
            .await
            .unwrap();
        assert_eq!(row["content"], doc);
        assert_eq!(row["summary"], Value::Null);

        let listed = list.execute(json!({}), &ctx("b")).await.unwrap();
        assert_eq!(listed[0]["title"], "Design notes");
        assert!(listed[0].get("content").is_none());
    }

    #[tokio::test]
    async fn load_missing_buffer_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let load = LoadBufferTool::new(stores(&dir));
        let err = load.execute(json!({"buffer_id": 3}), &ctx("b")).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
