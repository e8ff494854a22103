use std::sync::Arc;
use std::time::Duration;

use agentdb_core::settings::ServerSettings;
use agentdb_store::AgentStores;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::handlers::{self, HandlerState};
use crate::rpc::{RpcRequest, RpcResponse};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9191,
            request_timeout_secs: 30,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            request_timeout_secs: settings.request_timeout_secs,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler_state: Arc<HandlerState>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/tools", get(tools_handler))
        .route("/health", get(health_handler))
        .route("/api/agents", get(admin::list_agents))
        .route(
            "/api/agents/{agent_id}/memories",
            get(admin::list_memories).post(admin::create_memory),
        )
        .route(
            "/api/agents/{agent_id}/memories/{memory_id}",
            get(admin::get_memory).put(admin::update_memory),
        )
        .route(
            "/api/agents/{agent_id}/todos",
            get(admin::list_todos).post(admin::create_todo),
        )
        .route(
            "/api/agents/{agent_id}/todos/{todo_id}",
            get(admin::get_todo).put(admin::update_todo),
        )
        .route(
            "/api/agents/{agent_id}/skills",
            get(admin::list_skills).post(admin::create_skill),
        )
        .route(
            "/api/agents/{agent_id}/skills/{skill_id}",
            get(admin::get_skill)
                .put(admin::update_skill)
                .delete(admin::delete_skill),
        )
        .route(
            "/api/agents/{agent_id}/buffers",
            get(admin::list_buffers).post(admin::create_buffer),
        )
        .route(
            "/api/agents/{agent_id}/buffers/{buffer_id}",
            get(admin::get_buffer)
                .put(admin::update_buffer)
                .delete(admin::delete_buffer),
        )
        .route(
            "/api/agents/{agent_id}/system_prompts",
            get(admin::list_system_prompts).post(admin::create_system_prompt),
        )
        .route(
            "/api/agents/{agent_id}/system_prompts/{prompt_id}",
            get(admin::get_system_prompt),
        )
        .route("/api/agents/{agent_id}/tool_calls", get(admin::list_tool_calls))
        .route("/api/agents/{agent_id}/tool_calls/stats", get(admin::tool_call_stats))
        .route("/api/agents/{agent_id}/awakenings", get(admin::list_awakenings))
        .route("/api/agents/{agent_id}/awakenings/{awakening_id}", get(admin::get_awakening))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and start serving. Returns once the listener is bound.
pub async fn start(
    config: ServerConfig,
    stores: Arc<AgentStores>,
) -> Result<ServerHandle, std::io::Error> {
    let handler_state = Arc::new(HandlerState::new(stores));
    start_with_state(config, handler_state).await
}

pub async fn start_with_state(
    config: ServerConfig,
    handler_state: Arc<HandlerState>,
) -> Result<ServerHandle, std::io::Error> {
    let tools = handler_state.registry.count();
    let router = build_router(
        AppState { handler_state },
        Duration::from_secs(config.request_timeout_secs),
    );
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(addr = %local_addr, tools, "agentdb server started");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::error!(error = %e, "server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        shutdown_tx: Some(shutdown_tx),
        server,
    })
}

/// Handle returned by `start()`. Dropping it leaves the server running.
pub struct ServerHandle {
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.server.await;
    }

    /// Wait until the server task exits.
    pub async fn wait(self) {
        let _ = self.server.await;
    }
}

/// `POST /rpc`. Always answers 200 with an [`RpcResponse`] body.
async fn rpc_handler(State(state): State<AppState>, body: String) -> Json<RpcResponse> {
    let request: RpcRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return Json(RpcResponse::parse_error(format!("Parse error: {e}"))),
    };
    let params = request.params.unwrap_or(serde_json::json!({}));
    Json(handlers::dispatch(&state.handler_state, &request.method, params, request.id).await)
}

/// `GET /tools`: definitions of every registered tool.
async fn tools_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.handler_state.registry.definitions())
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.handler_state.stores.list_agents() {
        Ok(agents) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "healthy", "agents": agents.len()})),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "unhealthy", "error": e.to_string()})),
            )
        }
    }
}
