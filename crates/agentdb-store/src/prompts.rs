use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// One version of the agent's system prompt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemPromptRow {
    pub id: i64,
    pub content: String,
    pub version: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

const COLUMNS: &str = "id, content, version, is_active, created_at, updated_at";

pub struct PromptRepo {
    db: Database,
}

impl PromptRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The active prompt; the highest version wins if several are active.
    #[instrument(skip(self))]
    pub fn active(&self) -> Result<Option<SystemPromptRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM system_prompts
                 WHERE is_active = 1 ORDER BY version DESC, id DESC LIMIT 1"
            ))?;
            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_prompt(row)?)),
                None => Ok(None),
            }
        })
    }

    /// Replace the active prompt with a new version.
    ///
    /// Deactivation of every prior version and the insert happen in one
    /// transaction, so exactly one row is active afterwards.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub fn update(&self, content: &str) -> Result<SystemPromptRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_tx(|tx| {
            let current: i64 = tx.query_row(
                "SELECT COALESCE(MAX(version), 0) FROM system_prompts",
                [],
                |row| row.get(0),
            )?;
            tx.execute(
                "UPDATE system_prompts SET is_active = 0, updated_at = ?1 WHERE is_active = 1",
                [&now],
            )?;
            let version = current + 1;
            tx.execute(
                "INSERT INTO system_prompts (content, version, is_active, created_at, updated_at)
                 VALUES (?1, ?2, 1, ?3, ?3)",
                rusqlite::params![content, version, now],
            )?;
            let id = tx.last_insert_rowid();
            debug!(id, version, "system prompt versioned");
            fetch(tx, id)
        })
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<SystemPromptRow, StoreError> {
        self.db.with_conn(|conn| fetch(conn, id))
    }

    /// Every version, newest first.
    #[instrument(skip(self))]
    pub fn history(&self) -> Result<Vec<SystemPromptRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM system_prompts ORDER BY version DESC, id DESC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_prompt(row)?);
            }
            Ok(results)
        })
    }
}

fn fetch(conn: &Connection, id: i64) -> Result<SystemPromptRow, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM system_prompts WHERE id = ?1"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => row_to_prompt(row),
        None => Err(StoreError::NotFound(format!("system prompt {id}"))),
    }
}

fn row_to_prompt(row: &rusqlite::Row<'_>) -> Result<SystemPromptRow, StoreError> {
    Ok(SystemPromptRow {
        id: row_helpers::get(row, 0, "system_prompts", "id")?,
        content: row_helpers::get(row, 1, "system_prompts", "content")?,
        version: row_helpers::get(row, 2, "system_prompts", "version")?,
        is_active: row_helpers::get(row, 3, "system_prompts", "is_active")?,
        created_at: row_helpers::get(row, 4, "system_prompts", "created_at")?,
        updated_at: row_helpers::get(row, 5, "system_prompts", "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> PromptRepo {
        PromptRepo::new(Database::in_memory().unwrap())
    }

    #[test]
    fn empty_has_no_active_prompt() {
        assert!(repo().active().unwrap().is_none());
    }

    #[test]
    fn first_update_is_version_one() {
        let repo = repo();
        let row = repo.update("You are a research assistant.").unwrap();
        assert_eq!(row.version, 1);
        assert!(row.is_active);
        assert_eq!(repo.active().unwrap().unwrap().content, "You are a research assistant.");
    }

    #[test]
    fn update_deactivates_previous_versions() {
        let repo = repo();
        repo.update("v1").unwrap();
        repo.update("v2").unwrap();
        let v3 = repo.update("v3").unwrap();
        assert_eq!(v3.version, 3);

        let history = repo.history().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().filter(|p| p.is_active).count(), 1);
        assert_eq!(history[0].content, "v3");
        assert!(history[0].is_active);
    }

    #[test]
    fn highest_active_version_wins() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO system_prompts (content, version, is_active, created_at, updated_at)
                 VALUES ('old', 1, 1, 't', 't'), ('new', 2, 1, 't', 't');",
            )?;
            Ok(())
        })
        .unwrap();
        let active = PromptRepo::new(db).active().unwrap().unwrap();
        assert_eq!(active.content, "new");
        assert_eq!(active.version, 2);
    }

    #[test]
    fn get_by_id_and_missing() {
        let repo = repo();
        let v1 = repo.update("first").unwrap();
        repo.update("second").unwrap();
        let fetched = repo.get(v1.id).unwrap();
        assert_eq!(fetched.content, "first");
        assert!(!fetched.is_active);
        assert!(matches!(repo.get(99), Err(StoreError::NotFound(_))));
    }
}
