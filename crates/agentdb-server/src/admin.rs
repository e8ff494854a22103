//! Admin endpoints over existing agent databases.
//!
//! Every route resolves the agent with `open_existing`, so an unknown agent
//! is a 404 and never creates a file. Todos, memories and system prompts
//! have no delete route; prompts change only by adding a new version.

use std::sync::Arc;

use agentdb_core::AgentId;
use agentdb_store::buffers::BufferUpdate;
use agentdb_store::memories::{Importance, MemoryType, MemoryUpdate};
use agentdb_store::row_helpers::parse_input;
use agentdb_store::skills::{NewSkill, SkillUpdate};
use agentdb_store::todos::{Priority, TodoStatus, TodoUpdate};
use agentdb_store::{AgentStore, AgentStores, StoreError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::server::AppState;

pub const TOOL_CALLS_DEFAULT_LIMIT: u32 = 50;
pub const TOOL_CALLS_MAX_LIMIT: u32 = 200;
pub const AWAKENINGS_LIMIT: u32 = 50;

/// Admin endpoint failure, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => Self::NotFound(e.to_string()),
            StoreError::Validation { .. } => Self::BadRequest(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::Internal(m) => {
                tracing::error!(error = %m, "admin request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn existing_store(stores: &AgentStores, raw: &str) -> Result<AgentStore, ApiError> {
    let agent = AgentId::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(stores.open_existing(&agent)?)
}

fn stores(state: &AppState) -> &Arc<AgentStores> {
    &state.handler_state.stores
}

/// `GET /api/agents`: every agent with its record counts.
pub async fn list_agents(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stores = stores(&state);
    let mut agents = Vec::new();
    for agent in stores.list_agents()? {
        agents.push(stores.get_or_open(&agent)?.summary()?);
    }
    Ok(Json(json!(agents)))
}

type Created = (StatusCode, Json<Value>);

fn created<T: serde::Serialize>(row: &T) -> Created {
    (StatusCode::CREATED, Json(json!(row)))
}

fn deleted(id: i64) -> Json<Value> {
    Json(json!({ "deleted": id }))
}

// --- memories ---

#[derive(Debug, Deserialize)]
pub struct MemoryCreate {
    pub title: String,
    pub content: String,
    pub importance: Option<f64>,
    pub mem_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemoryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub importance: Option<f64>,
    pub mem_type: Option<String>,
}

impl MemoryPatch {
    fn into_update(self) -> Result<MemoryUpdate, StoreError> {
        Ok(MemoryUpdate {
            title: self.title,
            content: self.content,
            importance: self.importance.map(Importance::new).transpose()?,
            mem_type: self
                .mem_type
                .map(|raw| parse_input::<MemoryType>(&raw, "mem_type"))
                .transpose()?,
        })
    }
}

pub async fn list_memories(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.memories().list()?)))
}

pub async fn get_memory(
    State(state): State<AppState>,
    Path((agent_id, memory_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.memories().get(memory_id)?)))
}

pub async fn create_memory(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(body): Json<MemoryCreate>,
) -> Result<Created, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let importance = body.importance.map(Importance::new).transpose()?.unwrap_or_default();
    let mem_type = match body.mem_type {
        Some(raw) => parse_input::<MemoryType>(&raw, "mem_type")?,
        None => MemoryType::default(),
    };
    let row = store.memories().add(&body.title, &body.content, importance, mem_type)?;
    Ok(created(&row))
}

pub async fn update_memory(
    State(state): State<AppState>,
    Path((agent_id, memory_id)): Path<(String, i64)>,
    Json(body): Json<MemoryPatch>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let row = store.memories().update(memory_id, body.into_update()?)?;
    Ok(Json(json!(row)))
}

// --- todos ---

#[derive(Debug, Deserialize)]
pub struct TodoQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TodoCreate {
    pub content: String,
    pub priority: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TodoPatch {
    pub status: Option<String>,
    pub priority: Option<i64>,
}

pub async fn list_todos(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<TodoQuery>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let status = query
        .status
        .map(|raw| parse_input::<TodoStatus>(&raw, "status"))
        .transpose()?;
    Ok(Json(json!(store.todos().list(status)?)))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Path((agent_id, todo_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.todos().get(todo_id)?)))
}

pub async fn create_todo(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(body): Json<TodoCreate>,
) -> Result<Created, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let priority = body.priority.map(Priority::new).transpose()?.unwrap_or_default();
    Ok(created(&store.todos().add(&body.content, priority)?))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path((agent_id, todo_id)): Path<(String, i64)>,
    Json(body): Json<TodoPatch>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let update = TodoUpdate {
        status: body
            .status
            .map(|raw| parse_input::<TodoStatus>(&raw, "status"))
            .transpose()?,
        priority: body.priority.map(Priority::new).transpose()?,
    };
    Ok(Json(json!(store.todos().update(todo_id, update)?)))
}

// --- skills ---

#[derive(Debug, Deserialize)]
pub struct SkillCreate {
    pub category: String,
    pub name: String,
    pub description: String,
    pub full_doc: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SkillPatch {
    pub category: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub full_doc: Option<String>,
}

pub async fn list_skills(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.skills().list()?)))
}

pub async fn get_skill(
    State(state): State<AppState>,
    Path((agent_id, skill_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.skills().get(skill_id)?)))
}

pub async fn create_skill(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(body): Json<SkillCreate>,
) -> Result<Created, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let row = store.skills().add(NewSkill {
        category: &body.category,
        name: &body.name,
        description: &body.description,
        full_doc: body.full_doc.as_deref(),
    })?;
    Ok(created(&row))
}

pub async fn update_skill(
    State(state): State<AppState>,
    Path((agent_id, skill_id)): Path<(String, i64)>,
    Json(body): Json<SkillPatch>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let update = SkillUpdate {
        category: body.category,
        name: body.name,
        description: body.description,
        full_doc: body.full_doc,
    };
    Ok(Json(json!(store.skills().update(skill_id, update)?)))
}

pub async fn delete_skill(
    State(state): State<AppState>,
    Path((agent_id, skill_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    store.skills().delete(skill_id)?;
    Ok(deleted(skill_id))
}

// --- buffers ---

#[derive(Debug, Deserialize)]
pub struct BufferCreate {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BufferPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
}

pub async fn list_buffers(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.buffers().list()?)))
}

pub async fn get_buffer(
    State(state): State<AppState>,
    Path((agent_id, buffer_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.buffers().get(buffer_id)?)))
}

pub async fn create_buffer(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(body): Json<BufferCreate>,
) -> Result<Created, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let row = store
        .buffers()
        .store(&body.title, &body.content, body.summary.as_deref())?;
    Ok(created(&row))
}

pub async fn update_buffer(
    State(state): State<AppState>,
    Path((agent_id, buffer_id)): Path<(String, i64)>,
    Json(body): Json<BufferPatch>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let update = BufferUpdate {
        title: body.title,
        content: body.content,
        summary: body.summary,
    };
    Ok(Json(json!(store.buffers().update(buffer_id, update)?)))
}

pub async fn delete_buffer(
    State(state): State<AppState>,
    Path((agent_id, buffer_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    store.buffers().delete(buffer_id)?;
    Ok(deleted(buffer_id))
}

// --- system prompts ---

#[derive(Debug, Deserialize)]
pub struct PromptCreate {
    pub content: String,
}

/// Every prompt version, newest first.
pub async fn list_system_prompts(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.prompts().history()?)))
}

pub async fn get_system_prompt(
    State(state): State<AppState>,
    Path((agent_id, prompt_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.prompts().get(prompt_id)?)))
}

/// Adds a new active version and deactivates the rest.
pub async fn create_system_prompt(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(body): Json<PromptCreate>,
) -> Result<Created, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(created(&store.prompts().update(&body.content)?))
}

// --- tool calls and awakenings ---

#[derive(Debug, Deserialize)]
pub struct ToolCallQuery {
    pub tool_name: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_tool_calls(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<ToolCallQuery>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    let limit = match query.limit {
        None => TOOL_CALLS_DEFAULT_LIMIT,
        Some(n) => n.clamp(1, i64::from(TOOL_CALLS_MAX_LIMIT)) as u32,
    };
    let calls = store.tool_calls().list(query.tool_name.as_deref(), limit)?;
    Ok(Json(json!(calls)))
}

pub async fn tool_call_stats(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.tool_calls().stats()?)))
}

pub async fn list_awakenings(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.awakenings().list(AWAKENINGS_LIMIT)?)))
}

pub async fn get_awakening(
    State(state): State<AppState>,
    Path((agent_id, awakening_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let store = existing_store(stores(&state), &agent_id)?;
    Ok(Json(json!(store.awakenings().get(awakening_id)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::NotFound("agent x".into()), StatusCode::NOT_FOUND),
            (
                StoreError::Validation {
                    field: "priority",
                    message: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (StoreError::Database("locked".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn invalid_agent_id_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let stores =
            AgentStores::new(dir.path(), agentdb_store::ConnectionConfig::default()).unwrap();
        let err = existing_store(&stores, "no spaces").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        let err = existing_store(&stores, "ghost").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn memory_patch_validates_fields() {
        let patch = MemoryPatch {
            importance: Some(1.5),
            ..Default::default()
        };
        let err = ApiError::from(patch.into_update().unwrap_err());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let patch = MemoryPatch {
            mem_type: Some("rumor".into()),
            ..Default::default()
        };
        assert!(matches!(
            patch.into_update(),
            Err(StoreError::Validation { field: "mem_type", .. })
        ));

        let patch = MemoryPatch {
            importance: Some(0.2),
            mem_type: Some("insight".into()),
            ..Default::default()
        };
        let update = patch.into_update().unwrap();
        assert_eq!(update.mem_type, Some(MemoryType::Insight));
        assert_eq!(update.importance.map(Importance::get), Some(0.2));
    }
}
