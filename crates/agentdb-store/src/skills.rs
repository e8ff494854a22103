use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// A skill with its full documentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillRow {
    pub id: i64,
    pub category: String,
    pub name: String,
    pub description: String,
    pub full_doc: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Catalog entry. Never carries `full_doc`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Admin listing row: every column except `full_doc`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillListing {
    pub id: i64,
    pub category: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Skills grouped by category; categories and names both sorted.
pub type SkillCatalog = BTreeMap<String, Vec<SkillSummary>>;

#[derive(Clone, Debug)]
pub struct NewSkill<'a> {
    pub category: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub full_doc: Option<&'a str>,
}

/// Partial update applied by [`SkillRepo::update`]; `None` keeps the value.
#[derive(Clone, Debug, Default)]
pub struct SkillUpdate {
    pub category: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub full_doc: Option<String>,
}

const COLUMNS: &str = "id, category, name, description, full_doc, created_at, updated_at";

pub struct SkillRepo {
    db: Database,
}

impl SkillRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, skill), fields(category = skill.category, name = skill.name))]
    pub fn add(&self, skill: NewSkill<'_>) -> Result<SkillRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO skills (category, name, description, full_doc, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![
                    skill.category,
                    skill.name,
                    skill.description,
                    skill.full_doc,
                    now
                ],
            )?;
            Ok(SkillRow {
                id: conn.last_insert_rowid(),
                category: skill.category.to_string(),
                name: skill.name.to_string(),
                description: skill.description.to_string(),
                full_doc: skill.full_doc.map(str::to_string),
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<SkillRow, StoreError> {
        self.db.with_conn(|conn| fetch(conn, id))
    }

    /// All skills without `full_doc`, by category then name.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<SkillListing>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, category, name, description, created_at, updated_at FROM skills
                 ORDER BY category, name, id",
            )?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(SkillListing {
                    id: row_helpers::get(row, 0, "skills", "id")?,
                    category: row_helpers::get(row, 1, "skills", "category")?,
                    name: row_helpers::get(row, 2, "skills", "name")?,
                    description: row_helpers::get(row, 3, "skills", "description")?,
                    created_at: row_helpers::get(row, 4, "skills", "created_at")?,
                    updated_at: row_helpers::get(row, 5, "skills", "updated_at")?,
                });
            }
            Ok(results)
        })
    }

    #[instrument(skip(self, update))]
    pub fn update(&self, id: i64, update: SkillUpdate) -> Result<SkillRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_tx(|tx| {
            let current = fetch(tx, id)?;
            tx.execute(
                "UPDATE skills
                 SET category = ?1, name = ?2, description = ?3, full_doc = ?4, updated_at = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    update.category.unwrap_or(current.category),
                    update.name.unwrap_or(current.name),
                    update.description.unwrap_or(current.description),
                    update.full_doc.or(current.full_doc),
                    now,
                    id,
                ],
            )?;
            fetch(tx, id)
        })
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            if conn.execute("DELETE FROM skills WHERE id = ?1", [id])? == 0 {
                return Err(StoreError::NotFound(format!("skill {id}")));
            }
            debug!(id, "skill deleted");
            Ok(())
        })
    }

    /// Metadata-only catalog. `full_doc` is not selected.
    #[instrument(skip(self))]
    pub fn catalog(&self) -> Result<SkillCatalog, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, category, name, description FROM skills
                 ORDER BY category, name, id",
            )?;
            let mut rows = stmt.query([])?;
            let mut catalog = SkillCatalog::new();
            while let Some(row) = rows.next()? {
                let category: String = row_helpers::get(row, 1, "skills", "category")?;
                catalog.entry(category).or_default().push(SkillSummary {
                    id: row_helpers::get(row, 0, "skills", "id")?,
                    name: row_helpers::get(row, 2, "skills", "name")?,
                    description: row_helpers::get(row, 3, "skills", "description")?,
                });
            }
            Ok(catalog)
        })
    }
}

fn fetch(conn: &Connection, id: i64) -> Result<SkillRow, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM skills WHERE id = ?1"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(SkillRow {
            id: row_helpers::get(row, 0, "skills", "id")?,
            category: row_helpers::get(row, 1, "skills", "category")?,
            name: row_helpers::get(row, 2, "skills", "name")?,
            description: row_helpers::get(row, 3, "skills", "description")?,
            full_doc: row_helpers::get_opt(row, 4, "skills", "full_doc")?,
            created_at: row_helpers::get(row, 5, "skills", "created_at")?,
            updated_at: row_helpers::get(row, 6, "skills", "updated_at")?,
        }),
        None => Err(StoreError::NotFound(format!("skill {id}"))),
    }
}
