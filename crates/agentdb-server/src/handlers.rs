//! Tool-surface dispatch: one RPC method per registered tool.

use std::sync::Arc;
use std::time::Instant;

use agentdb_core::{AgentId, ToolContext, ToolError};
use agentdb_engine::{create_default_registry, ToolRegistry};
use agentdb_store::AgentStores;
use tracing::{info, warn};

use crate::rpc::{self, RpcResponse};

/// Shared state available to all handlers.
pub struct HandlerState {
    pub stores: Arc<AgentStores>,
    pub registry: ToolRegistry,
}

impl HandlerState {
    /// State with the default tool set registered over `stores`.
    pub fn new(stores: Arc<AgentStores>) -> Self {
        let registry = create_default_registry(Arc::clone(&stores));
        Self { stores, registry }
    }
}

/// Dispatch an RPC method to the tool of the same name.
///
/// `params.agent_id` selects the agent and stays in the arguments handed to
/// the tool, so it also shows up in the call's input summary.
pub async fn dispatch(
    state: &HandlerState,
    method: &str,
    params: serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let Some(tool) = state.registry.get(method) else {
        return RpcResponse::method_not_found(id, method);
    };

    let agent_id = match rpc::require_str(&params, "agent_id") {
        Ok(raw) => match AgentId::parse(raw) {
            Ok(agent_id) => agent_id,
            Err(e) => return RpcResponse::from_tool_error(id, &ToolError::from(e)),
        },
        Err(msg) => return RpcResponse::invalid_field(id, "agent_id", msg),
    };

    let ctx = ToolContext::new(agent_id);
    let start = Instant::now();
    let result = tool.execute(params, &ctx).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(value) => {
            info!(method, agent_id = %ctx.agent_id, duration_ms, "rpc ok");
            RpcResponse::success(id, value)
        }
        Err(e) => {
            warn!(
                method,
                agent_id = %ctx.agent_id,
                duration_ms,
                kind = e.error_kind(),
                error = %e,
                "rpc failed"
            );
            RpcResponse::from_tool_error(id, &e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdb_store::ConnectionConfig;
    use serde_json::json;

    fn state(dir: &tempfile::TempDir) -> HandlerState {
        let stores = AgentStores::new(dir.path(), ConnectionConfig::default()).unwrap();
        HandlerState::new(Arc::new(stores))
    }

    #[tokio::test]
    async fn unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let params = json!({"agent_id": "a"});
        let resp = dispatch(&state(&dir), "teleport", params, Some(json!(1))).await;
        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().code, "METHOD_NOT_FOUND");
    }

    #[tokio::test]
    async fn missing_agent_id_names_field() {
        let dir = tempfile::tempdir().unwrap();
        let resp = dispatch(&state(&dir), "list_todos", json!({}), None).await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, "INVALID_PARAMS");
        assert_eq!(error.field.as_deref(), Some("agent_id"));
    }

    #[tokio::test]
    async fn invalid_agent_id_rejected_without_creating_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let resp = dispatch(&state, "list_todos", json!({"agent_id": "../escape"}), None).await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, "INVALID_PARAMS");
        assert_eq!(error.field.as_deref(), Some("agent_id"));
        assert!(state.stores.list_agents().unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_then_list_todos() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let added = dispatch(
            &state,
            "add_todo",
            json!({"agent_id": "ops", "content": "rotate keys", "priority": 8}),
            Some(json!(1)),
        )
        .await;
        assert!(added.success);
        assert_eq!(added.id, Some(json!(1)));

        let listed = dispatch(&state, "list_todos", json!({"agent_id": "ops"}), None).await;
        let todos = listed.result.unwrap();
        assert_eq!(todos[0]["content"], "rotate keys");
        assert_eq!(todos[0]["priority"], 8);
    }

    #[tokio::test]
    async fn validation_failure_maps_to_invalid_params() {
        let dir = tempfile::tempdir().unwrap();
        let resp = dispatch(
            &state(&dir),
            "remember",
            json!({"agent_id": "a", "title": "t", "content": "c", "importance": 2.0}),
            None,
        )
        .await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, "INVALID_PARAMS");
        assert_eq!(error.field.as_deref(), Some("importance"));
    }

    #[tokio::test]
    async fn missing_record_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let params = json!({"agent_id": "a", "buffer_id": 9});
        let resp = dispatch(&state(&dir), "load_buffer", params, None).await;
        assert_eq!(resp.error.unwrap().code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn input_summary_includes_agent_id() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        dispatch(&state, "list_todos", json!({"agent_id": "scribe"}), None).await;

        let store = state.stores.get_or_open(&AgentId::parse("scribe").unwrap()).unwrap();
        let mut calls = store.tool_calls().list(None, 10).unwrap();
        for _ in 0..100 {
            if !calls.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            calls = store.tool_calls().list(None, 10).unwrap();
        }
        assert_eq!(calls.len(), 1);
        assert!(calls[0].input_summary.as_deref().unwrap().contains("scribe"));
    }
}
