use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Error,
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for CallStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown call status {other:?}, expected success or error")),
        }
    }
}

/// Who wrote the record: the interceptor (`auto`) or an explicit
/// `log_tool_call` (`manual`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    Auto,
    Manual,
}

impl std::fmt::Display for CallSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for CallSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown call source {other:?}, expected auto or manual")),
        }
    }
}

/// A record about to be appended. Owned so it can move onto a blocking task.
#[derive(Clone, Debug, PartialEq)]
pub struct NewToolCall {
    pub tool_name: String,
    pub status: CallStatus,
    pub input_summary: Option<String>,
    pub output_summary: Option<String>,
    pub duration_ms: Option<i64>,
    pub source: CallSource,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRow {
    pub id: i64,
    pub tool_name: String,
    pub status: CallStatus,
    pub input_summary: Option<String>,
    pub output_summary: Option<String>,
    pub duration_ms: Option<i64>,
    pub source: CallSource,
    pub created_at: String,
}

/// Compact history entry shown at awakening.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRef {
    pub id: i64,
    pub tool_name: String,
    pub status: CallStatus,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolStats {
    pub tool_name: String,
    pub total_calls: i64,
    pub success_count: i64,
    pub error_count: i64,
    /// `success_count / total_calls`, in `[0.0, 1.0]`.
    pub success_rate: f64,
    /// `None` when no record for the tool carries a duration.
    pub avg_duration_ms: Option<f64>,
}

const COLUMNS: &str =
    "id, tool_name, status, input_summary, output_summary, duration_ms, source, created_at";

pub struct ToolCallRepo {
    db: Database,
}

impl ToolCallRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, call), fields(tool = %call.tool_name, status = %call.status, source = %call.source))]
    pub fn append(&self, call: &NewToolCall) -> Result<ToolCallRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tool_calls
                    (tool_name, status, input_summary, output_summary, duration_ms, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    call.tool_name,
                    call.status.to_string(),
                    call.input_summary,
                    call.output_summary,
                    call.duration_ms,
                    call.source.to_string(),
                    now,
                ],
            )?;
            Ok(ToolCallRow {
                id: conn.last_insert_rowid(),
                tool_name: call.tool_name.clone(),
                status: call.status,
                input_summary: call.input_summary.clone(),
                output_summary: call.output_summary.clone(),
                duration_ms: call.duration_ms,
                source: call.source,
                created_at: now,
            })
        })
    }

    /// Newest first, optionally restricted to one tool.
    #[instrument(skip(self))]
    pub fn list(&self, tool_name: Option<&str>, limit: u32) -> Result<Vec<ToolCallRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM tool_calls
                 WHERE ?1 IS NULL OR tool_name = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            ))?;
            let mut rows = stmt.query(rusqlite::params![tool_name, limit])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_call(row)?);
            }
            Ok(results)
        })
    }

    /// The `limit` most recent calls in compact form.
    #[instrument(skip(self))]
    pub fn recent_refs(&self, limit: u32) -> Result<Vec<ToolCallRef>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tool_name, status, created_at FROM tool_calls
                 ORDER BY created_at DESC, id DESC LIMIT ?1",
            )?;
            let mut rows = stmt.query([limit])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                let status: String = row_helpers::get(row, 2, "tool_calls", "status")?;
                results.push(ToolCallRef {
                    id: row_helpers::get(row, 0, "tool_calls", "id")?,
                    tool_name: row_helpers::get(row, 1, "tool_calls", "tool_name")?,
                    status: row_helpers::parse_enum(&status, "tool_calls", "status")?,
                    created_at: row_helpers::get(row, 3, "tool_calls", "created_at")?,
                });
            }
            Ok(results)
        })
    }

    /// Per-tool aggregates, busiest tool first.
    #[instrument(skip(self))]
    pub fn stats(&self) -> Result<Vec<ToolStats>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT tool_name,
                        COUNT(*) AS total_calls,
                        SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END) AS success_count,
                        SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END) AS error_count,
                        AVG(duration_ms) AS avg_duration_ms
                 FROM tool_calls
                 GROUP BY tool_name
                 ORDER BY total_calls DESC, tool_name ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                let total_calls: i64 = row_helpers::get(row, 1, "tool_calls", "total_calls")?;
                let success_count: i64 = row_helpers::get(row, 2, "tool_calls", "success_count")?;
                results.push(ToolStats {
                    tool_name: row_helpers::get(row, 0, "tool_calls", "tool_name")?,
                    total_calls,
                    success_count,
                    error_count: row_helpers::get(row, 3, "tool_calls", "error_count")?,
                    success_rate: if total_calls > 0 {
                        success_count as f64 / total_calls as f64
                    } else {
                        0.0
                    },
                    avg_duration_ms: row_helpers::get_opt(row, 4, "tool_calls", "avg_duration_ms")?,
                });
            }
            Ok(results)
        })
    }
}

fn row_to_call(row: &rusqlite::Row<'_>) -> Result<ToolCallRow, StoreError> {
    let status: String = row_helpers::get(row, 2, "tool_calls", "status")?;
    let source: String = row_helpers::get(row, 6, "tool_calls", "source")?;

    Ok(ToolCallRow {
        id: row_helpers::get(row, 0, "tool_calls", "id")?,
        tool_name: row_helpers::get(row, 1, "tool_calls", "tool_name")?,
        status: row_helpers::parse_enum(&status, "tool_calls", "status")?,
        input_summary: row_helpers::get_opt(row, 3, "tool_calls", "input_summary")?,
        output_summary: row_helpers::get_opt(row, 4, "tool_calls", "output_summary")?,
        duration_ms: row_helpers::get_opt(row, 5, "tool_calls", "duration_ms")?,
        source: row_helpers::parse_enum(&source, "tool_calls", "source")?,
        created_at: row_helpers::get(row, 7, "tool_calls", "created_at")?,
    })
}
