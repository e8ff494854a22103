use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// A long document, loaded only on demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BufferRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub created_at: String,
}

/// Reference shown at awakening: id and title only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferRef {
    pub id: i64,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferListing {
    pub id: i64,
    pub title: String,
    pub created_at: String,
}

/// Partial update applied by [`BufferRepo::update`]; `None` keeps the value.
#[derive(Clone, Debug, Default)]
pub struct BufferUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
}

pub struct BufferRepo {
    db: Database,
}

impl BufferRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, content, summary), fields(len = content.len()))]
    pub fn store(
        &self,
        title: &str,
        content: &str,
        summary: Option<&str>,
    ) -> Result<BufferRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO buffers (title, content, summary, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![title, content, summary, now],
            )?;
            Ok(BufferRow {
                id: conn.last_insert_rowid(),
                title: title.to_string(),
                content: content.to_string(),
                summary: summary.map(str::to_string),
                created_at: now,
            })
        })
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<BufferRow, StoreError> {
        self.db.with_conn(|conn| fetch(conn, id))
    }

    #[instrument(skip(self, update))]
    pub fn update(&self, id: i64, update: BufferUpdate) -> Result<BufferRow, StoreError> {
        self.db.with_tx(|tx| {
            let current = fetch(tx, id)?;
            tx.execute(
                "UPDATE buffers SET title = ?1, content = ?2, summary = ?3 WHERE id = ?4",
                rusqlite::params![
                    update.title.unwrap_or(current.title),
                    update.content.unwrap_or(current.content),
                    update.summary.or(current.summary),
                    id,
                ],
            )?;
            fetch(tx, id)
        })
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            if conn.execute("DELETE FROM buffers WHERE id = ?1", [id])? == 0 {
                return Err(StoreError::NotFound(format!("buffer {id}")));
            }
            debug!(id, "buffer deleted");
            Ok(())
        })
    }

    /// Newest first, without content.
    pub fn list(&self) -> Result<Vec<BufferListing>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, created_at FROM buffers ORDER BY created_at DESC, id DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(BufferListing {
                    id: row_helpers::get(row, 0, "buffers", "id")?,
                    title: row_helpers::get(row, 1, "buffers", "title")?,
                    created_at: row_helpers::get(row, 2, "buffers", "created_at")?,
                });
            }
            Ok(results)
        })
    }

    /// Newest first, id and title only.
    pub fn refs(&self) -> Result<Vec<BufferRef>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title FROM buffers ORDER BY created_at DESC, id DESC")?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(BufferRef {
                    id: row_helpers::get(row, 0, "buffers", "id")?,
                    title: row_helpers::get(row, 1, "buffers", "title")?,
                });
            }
            Ok(results)
        })
    }
}

fn fetch(conn: &Connection, id: i64) -> Result<BufferRow, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, title, content, summary, created_at FROM buffers WHERE id = ?1")?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(BufferRow {
            id: row_helpers::get(row, 0, "buffers", "id")?,
            title: row_helpers::get(row, 1, "buffers", "title")?,
            content: row_helpers::get(row, 2, "buffers", "content")?,
            summary: row_helpers::get_opt(row, 3, "buffers", "summary")?,
            created_at: row_helpers::get(row, 4, "buffers", "created_at")?,
        }),
        None => Err(StoreError::NotFound(format!("buffer {id}"))),
    }
}
