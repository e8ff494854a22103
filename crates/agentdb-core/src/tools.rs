use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// Context available to tools during execution.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub agent_id: AgentId,
}

impl ToolContext {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }
}

/// Tool definition exposed on the tool surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// Trait implemented by each tool.
///
/// Every tool shares the `(agent, args) -> result-or-failure` shape so the
/// call interceptor can wrap any of them uniformly.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters_schema(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Offending field, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Short classification string for logging and wire error codes.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) | Self::Validation { .. } => "invalid_params",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_error",
            Self::ExecutionFailed(_) => "execution_failed",
        }
    }
}

impl From<crate::ids::InvalidAgentId> for ToolError {
    fn from(e: crate::ids::InvalidAgentId) -> Self {
        Self::Validation {
            field: "agent_id",
            message: format!("{:?} must be non-empty and use only [A-Za-z0-9_-]", e.raw),
        }
    }
}

/// Deserialize tool arguments into a typed struct.
pub fn parse_args<T: DeserializeOwned>(args: &serde_json::Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        args.clone()
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
