use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Done,
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for TodoStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(format!(
                "unknown todo status {other:?}, expected pending, in_progress or done"
            )),
        }
    }
}

/// Todo priority, 1 (lowest) through 10 (highest).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    pub const DEFAULT: Priority = Priority(5);

    pub fn new(raw: i64) -> Result<Self, StoreError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&raw) {
            Ok(Self(raw as u8))
        } else {
            Err(StoreError::validation(
                "priority",
                format!("must be between {} and {}, got {raw}", Self::MIN, Self::MAX),
            ))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Priority {
    type Error = StoreError;
    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Priority> for i64 {
    fn from(p: Priority) -> Self {
        i64::from(p.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TodoRow {
    pub id: i64,
    pub content: String,
    pub priority: Priority,
    pub status: TodoStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update applied by [`TodoRepo::update`]; `None` keeps the value.
#[derive(Clone, Debug, Default)]
pub struct TodoUpdate {
    pub status: Option<TodoStatus>,
    pub priority: Option<Priority>,
}

const COLUMNS: &str = "id, content, priority, status, created_at, updated_at";

pub struct TodoRepo {
    db: Database,
}

impl TodoRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, content), fields(priority = priority.get()))]
    pub fn add(&self, content: &str, priority: Priority) -> Result<TodoRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos (content, priority, status, created_at, updated_at)
                 VALUES (?1, ?2, 'pending', ?3, ?3)",
                rusqlite::params![content, i64::from(priority), now],
            )?;
            fetch(conn, conn.last_insert_rowid())
        })
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<TodoRow, StoreError> {
        self.db.with_conn(|conn| fetch(conn, id))
    }

    /// All todos, optionally filtered by status, highest priority first.
    #[instrument(skip(self))]
    pub fn list(&self, status: Option<TodoStatus>) -> Result<Vec<TodoRow>, StoreError> {
        self.db.with_conn(|conn| match status {
            Some(status) => query(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM todos WHERE status = ?1
                     ORDER BY priority DESC, created_at DESC, id DESC"
                ),
                rusqlite::params![status.to_string()],
            ),
            None => query(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM todos
                     ORDER BY priority DESC, created_at DESC, id DESC"
                ),
                [],
            ),
        })
    }

    /// The `limit` most urgent pending todos.
    #[instrument(skip(self))]
    pub fn top_pending(&self, limit: u32) -> Result<Vec<TodoRow>, StoreError> {
        self.db.with_conn(|conn| {
            query(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM todos WHERE status = 'pending'
                     ORDER BY priority DESC, created_at DESC, id DESC LIMIT ?1"
                ),
                [limit],
            )
        })
    }

    #[instrument(skip(self))]
    pub fn update(&self, id: i64, update: TodoUpdate) -> Result<TodoRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_tx(|tx| {
            let current = fetch(tx, id)?;
            let status = update.status.unwrap_or(current.status);
            let priority = update.priority.unwrap_or(current.priority);
            tx.execute(
                "UPDATE todos SET status = ?1, priority = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![status.to_string(), i64::from(priority), now, id],
            )?;
            fetch(tx, id)
        })
    }

    pub fn complete(&self, id: i64) -> Result<TodoRow, StoreError> {
        self.update(
            id,
            TodoUpdate {
                status: Some(TodoStatus::Done),
                priority: None,
            },
        )
    }
}

fn fetch(conn: &Connection, id: i64) -> Result<TodoRow, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?1"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => row_to_todo(row),
        None => Err(StoreError::NotFound(format!("todo {id}"))),
    }
}

fn query<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<TodoRow>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        results.push(row_to_todo(row)?);
    }
    Ok(results)
}

fn row_to_todo(row: &rusqlite::Row<'_>) -> Result<TodoRow, StoreError> {
    let status_str: String = row_helpers::get(row, 3, "todos", "status")?;
    let priority: i64 = row_helpers::get(row, 2, "todos", "priority")?;

    Ok(TodoRow {
        id: row_helpers::get(row, 0, "todos", "id")?,
        content: row_helpers::get(row, 1, "todos", "content")?,
        priority: Priority::new(priority).map_err(|e| StoreError::CorruptRow {
            table: "todos",
            column: "priority",
            detail: e.to_string(),
        })?,
        status: row_helpers::parse_enum(&status_str, "todos", "status")?,
        created_at: row_helpers::get(row, 4, "todos", "created_at")?,
        updated_at: row_helpers::get(row, 5, "todos", "updated_at")?,
    })
}
