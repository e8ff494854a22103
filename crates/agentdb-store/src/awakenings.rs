use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// What one awakening loaded, by record id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAwakening {
    pub system_prompt_version: Option<i64>,
    pub todos: Vec<i64>,
    pub skills: Vec<i64>,
    pub memories: Vec<i64>,
    pub buffers: Vec<i64>,
    /// `None` when tool history was not requested.
    pub tool_calls: Option<Vec<i64>>,
    pub total_tokens: u32,
}

/// Immutable snapshot row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwakeningRow {
    pub id: i64,
    pub loaded_system_prompt_version: Option<i64>,
    pub loaded_todos: Vec<i64>,
    pub loaded_skills: Vec<i64>,
    pub loaded_memories: Vec<i64>,
    pub loaded_buffers: Vec<i64>,
    pub loaded_tool_calls: Option<Vec<i64>>,
    pub total_tokens: i64,
    pub created_at: String,
}

const COLUMNS: &str = "id, loaded_system_prompt_version, loaded_todos, loaded_skills, \
                       loaded_memories, loaded_buffers, loaded_tool_calls, total_tokens, created_at";

pub struct AwakeningRepo {
    db: Database,
}

impl AwakeningRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a snapshot and return its id.
    #[instrument(skip(self, snapshot), fields(total_tokens = snapshot.total_tokens))]
    pub fn record(&self, snapshot: &NewAwakening) -> Result<i64, StoreError> {
        let todos = serde_json::to_string(&snapshot.todos)?;
        let skills = serde_json::to_string(&snapshot.skills)?;
        let memories = serde_json::to_string(&snapshot.memories)?;
        let buffers = serde_json::to_string(&snapshot.buffers)?;
        let tool_calls = snapshot
            .tool_calls
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = row_helpers::now();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO awakenings
                    (loaded_system_prompt_version, loaded_todos, loaded_skills, loaded_memories,
                     loaded_buffers, loaded_tool_calls, total_tokens, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    snapshot.system_prompt_version,
                    todos,
                    skills,
                    memories,
                    buffers,
                    tool_calls,
                    snapshot.total_tokens,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub fn list(&self, limit: u32) -> Result<Vec<AwakeningRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM awakenings ORDER BY created_at DESC, id DESC LIMIT ?1"
            ))?;
            let mut rows = stmt.query([limit])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_awakening(row)?);
            }
            Ok(results)
        })
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<AwakeningRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM awakenings WHERE id = ?1"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => row_to_awakening(row),
                None => Err(StoreError::NotFound(format!("awakening {id}"))),
            }
        })
    }
}

fn row_to_awakening(row: &rusqlite::Row<'_>) -> Result<AwakeningRow, StoreError> {
    let list = |idx: usize, column: &'static str| -> Result<Vec<i64>, StoreError> {
        let raw: String = row_helpers::get(row, idx, "awakenings", column)?;
        row_helpers::parse_id_list(&raw, "awakenings", column)
    };
    let tool_calls: Option<String> =
        row_helpers::get_opt(row, 6, "awakenings", "loaded_tool_calls")?;

    Ok(AwakeningRow {
        id: row_helpers::get(row, 0, "awakenings", "id")?,
        loaded_system_prompt_version: row_helpers::get_opt(
            row,
            1,
            "awakenings",
            "loaded_system_prompt_version",
        )?,
        loaded_todos: list(2, "loaded_todos")?,
        loaded_skills: list(3, "loaded_skills")?,
        loaded_memories: list(4, "loaded_memories")?,
        loaded_buffers: list(5, "loaded_buffers")?,
        loaded_tool_calls: tool_calls
            .map(|raw| row_helpers::parse_id_list(&raw, "awakenings", "loaded_tool_calls"))
            .transpose()?,
        total_tokens: row_helpers::get(row, 7, "awakenings", "total_tokens")?,
        created_at: row_helpers::get(row, 8, "awakenings", "created_at")?,
    })
}
