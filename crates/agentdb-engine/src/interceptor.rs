//! Transparent audit logging around tool execution.
//!
//! [`LoggedTool`] times the inner tool, summarizes its input and output, and
//! appends an `auto` record to the calling agent's `tool_calls` table. The
//! inner result is returned untouched and logging failures never surface.
//! The write gets at most [`RECORD_GRACE`] before the result is returned;
//! past that it finishes in the background.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agentdb_core::text::truncate_chars;
use agentdb_core::{Tool, ToolContext, ToolError};
use agentdb_store::tool_calls::{CallSource, CallStatus, NewToolCall};
use agentdb_store::AgentStores;
use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Argument fields that usually carry whole documents.
pub const LARGE_FIELDS: [&str; 5] = ["content", "full_doc", "document", "text", "body"];
pub const LARGE_FIELD_MAX_CHARS: usize = 100;
pub const INPUT_SUMMARY_MAX_CHARS: usize = 200;
pub const OUTPUT_SUMMARY_MAX_CHARS: usize = 500;
/// Longest the caller waits on the record write before it is detached.
pub const RECORD_GRACE: Duration = Duration::from_millis(25);

/// Compact JSON summary of tool arguments. Empty or absent args give `None`.
pub fn summarize_input(args: &Value) -> Option<String> {
    let rendered = match args {
        Value::Null => return None,
        Value::Object(map) if map.is_empty() => return None,
        Value::Object(map) => {
            let mut filtered = map.clone();
            for field in LARGE_FIELDS {
                if let Some(Value::String(s)) = filtered.get_mut(field) {
                    *s = truncate_chars(s, LARGE_FIELD_MAX_CHARS);
                }
            }
            Value::Object(filtered).to_string()
        }
        Value::String(s) if s.is_empty() => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(truncate_chars(&rendered, INPUT_SUMMARY_MAX_CHARS))
}

/// Summary of a tool outcome: the serialized value on success, the error's
/// display text on failure.
pub fn summarize_output(result: &Result<Value, ToolError>) -> Option<String> {
    match result {
        Ok(value) => summarize_value(value),
        Err(e) => Some(truncate_chars(&e.to_string(), OUTPUT_SUMMARY_MAX_CHARS)),
    }
}

/// Serialized value cut to the output limit. Strings are taken verbatim.
pub fn summarize_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(truncate_chars(s, OUTPUT_SUMMARY_MAX_CHARS)),
        other => Some(truncate_chars(&other.to_string(), OUTPUT_SUMMARY_MAX_CHARS)),
    }
}

/// Wraps any tool and records every invocation.
pub struct LoggedTool {
    inner: Arc<dyn Tool>,
    stores: Arc<AgentStores>,
}

impl LoggedTool {
    pub fn new(inner: Arc<dyn Tool>, stores: Arc<AgentStores>) -> Self {
        Self { inner, stores }
    }

    /// Append the record on the blocking pool. The task logs its own
    /// outcome and runs to completion even if nobody awaits it.
    fn record(&self, ctx: &ToolContext, record: NewToolCall) -> JoinHandle<()> {
        let stores = Arc::clone(&self.stores);
        let agent_id = ctx.agent_id.clone();
        tokio::task::spawn_blocking(move || {
            let appended = stores
                .get_or_open(&agent_id)
                .and_then(|store| store.tool_calls().append(&record));
            match appended {
                Ok(row) => debug!(
                    agent_id = %agent_id,
                    tool = %row.tool_name,
                    call_id = row.id,
                    "tool call recorded"
                ),
                Err(e) => warn!(
                    agent_id = %agent_id,
                    tool = %record.tool_name,
                    error = %e,
                    "failed to record tool call"
                ),
            }
        })
    }
}

#[async_trait]
impl Tool for LoggedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn parameters_schema(&self) -> Value {
        self.inner.parameters_schema()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let input_summary = summarize_input(&args);
        let start = Instant::now();
        let result = self.inner.execute(args, ctx).await;
        let duration_ms = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);

        let status = if result.is_ok() {
            CallStatus::Success
        } else {
            CallStatus::Error
        };
        let record = NewToolCall {
            tool_name: self.inner.name().to_string(),
            status,
            input_summary,
            output_summary: summarize_output(&result),
            duration_ms: Some(duration_ms),
            source: CallSource::Auto,
        };
        let tool = record.tool_name.clone();
        match tokio::time::timeout(RECORD_GRACE, self.record(ctx, record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                agent_id = %ctx.agent_id,
                tool = %tool,
                error = %e,
                "tool call record task failed"
            ),
            Err(_) => debug!(
                agent_id = %ctx.agent_id,
                tool = %tool,
                "tool call record still pending"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_input_is_none() {
        assert_eq!(summarize_input(&Value::Null), None);
        assert_eq!(summarize_input(&json!({})), None);
    }

    #[test]
    fn small_input_passes_through() {
        let summary = summarize_input(&json!({"agent_id": "a", "priority": 3})).unwrap();
        let parsed: Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(parsed, json!({"agent_id": "a", "priority": 3}));
    }

    #[test]
    fn large_fields_cut_before_serializing() {
        let args = json!({"title": "t", "content": "c".repeat(150)});
        let summary = summarize_input(&args).unwrap();
        let parsed: Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(parsed["content"], format!("{}...", "c".repeat(100)));
        assert_eq!(parsed["title"], "t");
    }

    #[test]
    fn non_large_field_not_cut_individually() {
        let args = json!({"title": "t".repeat(150)});
        let summary = summarize_input(&args).unwrap();
        assert!(summary.contains(&"t".repeat(150)));
    }

    #[test]
    fn whole_input_cut_at_limit() {
        let args = json!({"a": "x".repeat(90), "b": "y".repeat(90), "c": "z".repeat(90)});
        let summary = summarize_input(&args).unwrap();
        assert_eq!(summary.chars().count(), INPUT_SUMMARY_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn output_cut_at_limit() {
        let summary = summarize_output(&Ok(json!({"data": "d".repeat(1000)}))).unwrap();
        assert_eq!(summary.chars().count(), OUTPUT_SUMMARY_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn error_output_uses_display() {
        let err: Result<Value, ToolError> = Err(ToolError::NotFound("todo 9".into()));
        assert_eq!(summarize_output(&err).unwrap(), "not found: todo 9");
    }

    #[test]
    fn null_output_is_none() {
        assert_eq!(summarize_output(&Ok(Value::Null)), None);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

        #[test]
        fn summaries_never_exceed_limits(
            title in "\\PC{0,300}",
            content in "\\PC{0,600}",
        ) {
            let args = json!({"title": title, "content": content});
            let input = summarize_input(&args).unwrap();
            proptest::prop_assert!(input.chars().count() <= INPUT_SUMMARY_MAX_CHARS + 3);

            if let Some(output) = summarize_value(&args) {
                proptest::prop_assert!(output.chars().count() <= OUTPUT_SUMMARY_MAX_CHARS + 3);
            }
        }
    }
}
