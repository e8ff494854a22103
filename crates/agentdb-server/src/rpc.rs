use agentdb_core::ToolError;
use serde::{Deserialize, Serialize};

/// Tool invocation request: `{method, params, id}`.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: Option<serde_json::Value>,
}

/// Wire format: `{ id, success, result?, error?: { code, message, field? } }`
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: Option<serde_json::Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
    /// Offending argument, for `INVALID_PARAMS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// Numeric codes used for routing; the wire carries the string form.
pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const NOT_FOUND: i32 = -32004;
pub const STORAGE_ERROR: i32 = -32005;

pub fn error_code_to_string(code: i32) -> &'static str {
    match code {
        PARSE_ERROR => "PARSE_ERROR",
        METHOD_NOT_FOUND => "METHOD_NOT_FOUND",
        INVALID_PARAMS => "INVALID_PARAMS",
        INTERNAL_ERROR => "INTERNAL_ERROR",
        NOT_FOUND => "NOT_FOUND",
        STORAGE_ERROR => "STORAGE_ERROR",
        _ => "UNKNOWN_ERROR",
    }
}

impl RpcResponse {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(RpcError {
                code: error_code_to_string(code).to_string(),
                message: message.into(),
                field: None,
            }),
        }
    }

    pub fn method_not_found(id: Option<serde_json::Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_field(
        id: Option<serde_json::Value>,
        field: &str,
        msg: impl Into<String>,
    ) -> Self {
        let mut resp = Self::error(id, INVALID_PARAMS, msg);
        if let Some(err) = resp.error.as_mut() {
            err.field = Some(field.to_string());
        }
        resp
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::error(None, PARSE_ERROR, msg)
    }

    /// Map a failed tool invocation onto the wire codes.
    pub fn from_tool_error(id: Option<serde_json::Value>, err: &ToolError) -> Self {
        match err {
            ToolError::Validation { field, .. } => Self::invalid_field(id, field, err.to_string()),
            ToolError::InvalidArguments(_) => Self::error(id, INVALID_PARAMS, err.to_string()),
            ToolError::NotFound(_) => Self::error(id, NOT_FOUND, err.to_string()),
            ToolError::Storage(_) => Self::error(id, STORAGE_ERROR, err.to_string()),
            ToolError::ExecutionFailed(_) => Self::error(id, INTERNAL_ERROR, err.to_string()),
        }
    }
}

/// Extract a required string param from the RPC params object.
pub fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing required parameter: {key}"))
}
