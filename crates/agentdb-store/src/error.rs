use agentdb_core::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },
}

impl StoreError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        StoreError::Pool(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<StoreError> for ToolError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation { field, message } => ToolError::Validation { field, message },
            StoreError::NotFound(what) => ToolError::NotFound(what),
            other => ToolError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_tool_validation() {
        let err: ToolError = StoreError::validation("importance", "must be between 0.0 and 1.0").into();
        assert_eq!(err.field(), Some("importance"));
        assert_eq!(err.to_string(), "invalid importance: must be between 0.0 and 1.0");
    }

    #[test]
    fn not_found_maps_to_tool_not_found() {
        let err: ToolError = StoreError::NotFound("todo 9".into()).into();
        assert!(matches!(err, ToolError::NotFound(ref s) if s == "todo 9"));
    }

    #[test]
    fn everything_else_is_storage() {
        let err: ToolError = StoreError::Database("disk I/O error".into()).into();
        assert_eq!(err.error_kind(), "storage_error");
        let err: ToolError = StoreError::CorruptRow {
            table: "todos",
            column: "status",
            detail: "unknown variant: x".into(),
        }
        .into();
        assert!(err.to_string().contains("todos.status"));
    }
}
