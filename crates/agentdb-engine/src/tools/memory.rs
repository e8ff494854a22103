//! Long-term memories: facts, experiences and insights ranked by importance.

use std::sync::Arc;

use agentdb_core::tools::parse_args;
use agentdb_core::{Tool, ToolContext, ToolError};
use agentdb_store::memories::{Importance, MemoryType, MemoryUpdate};
use agentdb_store::row_helpers::parse_input;
use agentdb_store::AgentStores;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{clamp_limit, object_schema, open_store, to_json};

const SEARCH_DEFAULT_LIMIT: u32 = 5;
const SEARCH_MAX_LIMIT: u32 = 100;

fn mem_type_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["fact", "experience", "insight"]
    })
}

fn importance_schema() -> Value {
    json!({"type": "number", "minimum": 0.0, "maximum": 1.0})
}

fn parse_mem_type(raw: Option<&str>) -> Result<Option<MemoryType>, ToolError> {
    Ok(raw
        .map(|s| parse_input::<MemoryType>(s, "mem_type"))
        .transpose()?)
}

// --- remember ---

pub struct RememberTool {
    stores: Arc<AgentStores>,
}

impl RememberTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct RememberArgs {
    title: String,
    content: String,
    importance: Option<f64>,
    mem_type: Option<String>,
}

#[async_trait]
impl Tool for RememberTool {
    fn name(&self) -> &str {
        "remember"
    }

    fn description(&self) -> &str {
        "Store a memory for future awakenings"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "title": {"type": "string", "description": "Short title for the memory"},
                "content": {"type": "string", "description": "Content to remember"},
                "importance": importance_schema(),
                "mem_type": mem_type_schema()
            }),
            &["title", "content"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: RememberArgs = parse_args(&args)?;
        let importance = match args.importance {
            Some(raw) => Importance::new(raw)?,
            None => Importance::DEFAULT,
        };
        let mem_type = parse_mem_type(args.mem_type.as_deref())?.unwrap_or_default();
        let row = open_store(&self.stores, ctx)?.memories().add(
            &args.title,
            &args.content,
            importance,
            mem_type,
        )?;
        Ok(json!({ "memory_id": row.id }))
    }
}

// --- update_memory ---

pub struct UpdateMemoryTool {
    stores: Arc<AgentStores>,
}

impl UpdateMemoryTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct UpdateArgs {
    memory_id: i64,
    title: Option<String>,
    content: Option<String>,
    importance: Option<f64>,
    mem_type: Option<String>,
}

#[async_trait]
impl Tool for UpdateMemoryTool {
    fn name(&self) -> &str {
        "update_memory"
    }

    fn description(&self) -> &str {
        "Edit a memory's title, content, importance or type"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "memory_id": {"type": "integer"},
                "title": {"type": "string"},
                "content": {"type": "string"},
                "importance": importance_schema(),
                "mem_type": mem_type_schema()
            }),
            &["memory_id"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: UpdateArgs = parse_args(&args)?;
        let update = MemoryUpdate {
            title: args.title,
            content: args.content,
            importance: args.importance.map(Importance::new).transpose()?,
            mem_type: parse_mem_type(args.mem_type.as_deref())?,
        };
        let row = open_store(&self.stores, ctx)?
            .memories()
            .update(args.memory_id, update)?;
        to_json(&row)
    }
}

// --- search_memories ---

pub struct SearchMemoriesTool {
    stores: Arc<AgentStores>,
}

impl SearchMemoriesTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    limit: Option<i64>,
}

#[async_trait]
impl Tool for SearchMemoriesTool {
    fn name(&self) -> &str {
        "search_memories"
    }

    fn description(&self) -> &str {
        "Keyword search over memory titles and content, most important first"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "query": {"type": "string"},
                "limit": {"type": "integer", "description": "Defaults to 5, at most 100"}
            }),
            &["query"],
        )
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: SearchArgs = parse_args(&args)?;
        let limit = clamp_limit(args.limit, SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT);
        let rows = open_store(&self.stores, ctx)?
            .memories()
            .search(&args.query, limit)?;
        to_json(&rows)
    }
}

// --- get_memory ---

pub struct GetMemoryTool {
    stores: Arc<AgentStores>,
}

impl GetMemoryTool {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self { stores }
    }
}

#[derive(Deserialize)]
struct GetArgs {
    memory_id: i64,
}

#[async_trait]
impl Tool for GetMemoryTool {
    fn name(&self) -> &str {
        "get_memory"
    }

    fn description(&self) -> &str {
        "Load one memory by id"
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({ "memory_id": {"type": "integer"} }), &["memory_id"])
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: GetArgs = parse_args(&args)?;
        let row = open_store(&self.stores, ctx)?.memories().get(args.memory_id)?;
        to_json(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ctx, stores};

    #[tokio::test]
    async fn remember_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        let remember = RememberTool::new(stores.clone());
        let get = GetMemoryTool::new(stores);

        let stored = remember
            .execute(json!({"title": "Rust", "content": "ownership"}), &ctx("m"))
            .await
            .unwrap();
        let row = get
            .execute(json!({"memory_id": stored["memory_id"]}), &ctx("m"))
            .await
            .unwrap();
        assert_eq!(row["importance"], 0.5);
        assert_eq!(row["mem_type"], "fact");
    }

    #[tokio::test]
    async fn remember_rejects_bad_importance_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let remember = RememberTool::new(stores(&dir));

        let err = remember
            .execute(json!({"title": "t", "content": "c", "importance": 1.5}), &ctx("m"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("importance"));

        let err = remember
            .execute(json!({"title": "t", "content": "c", "mem_type": "dream"}), &ctx("m"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("mem_type"));
    }

    #[tokio::test]
    async fn update_memory_changes_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        let remember = RememberTool::new(stores.clone());
        let update = UpdateMemoryTool::new(stores);

        let stored = remember
            .execute(
                json!({"title": "t", "content": "c", "importance": 0.8, "mem_type": "insight"}),
                &ctx("m"),
            )
            .await
            .unwrap();
        let row = update
            .execute(json!({"memory_id": stored["memory_id"], "importance": 0.3}), &ctx("m"))
            .await
            .unwrap();
        assert_eq!(row["importance"], 0.3);
        assert_eq!(row["title"], "t");
        assert_eq!(row["mem_type"], "insight");
    }

    #[tokio::test]
    async fn search_clamps_limit() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        let remember = RememberTool::new(stores.clone());
        let search = SearchMemoriesTool::new(stores);

        for i in 0..8 {
            remember
                .execute(json!({"title": format!("note {i}"), "content": "tokio"}), &ctx("m"))
                .await
                .unwrap();
        }
        let default = search.execute(json!({"query": "tokio"}), &ctx("m")).await.unwrap();
        assert_eq!(default.as_array().unwrap().len(), 5);

        let zero = search
            .execute(json!({"query": "tokio", "limit": 0}), &ctx("m"))
            .await
            .unwrap();
        assert_eq!(zero.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_memory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let get = GetMemoryTool::new(stores(&dir));
        let err = get.execute(json!({"memory_id": 404}), &ctx("m")).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
