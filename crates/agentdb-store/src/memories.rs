use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    #[default]
    Fact,
    Experience,
    Insight,
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fact => write!(f, "fact"),
            Self::Experience => write!(f, "experience"),
            Self::Insight => write!(f, "insight"),
        }
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fact" => Ok(Self::Fact),
            "experience" => Ok(Self::Experience),
            "insight" => Ok(Self::Insight),
            other => Err(format!(
                "unknown memory type {other:?}, expected fact, experience or insight"
            )),
        }
    }
}

/// Memory importance in `[0.0, 1.0]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Importance(f64);

impl Importance {
    pub const DEFAULT: Importance = Importance(0.5);

    pub fn new(raw: f64) -> Result<Self, StoreError> {
        if (0.0..=1.0).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(StoreError::validation(
                "importance",
                format!("must be between 0.0 and 1.0, got {raw}"),
            ))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Importance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for Importance {
    type Error = StoreError;
    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Importance> for f64 {
    fn from(i: Importance) -> Self {
        i.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub importance: Importance,
    pub mem_type: MemoryType,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub importance: Option<Importance>,
    pub mem_type: Option<MemoryType>,
}

const COLUMNS: &str = "id, title, content, importance, mem_type, created_at, updated_at";

pub struct MemoryRepo {
    db: Database,
}

impl MemoryRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, title, content))]
    pub fn add(
        &self,
        title: &str,
        content: &str,
        importance: Importance,
        mem_type: MemoryType,
    ) -> Result<MemoryRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO memories (title, content, importance, mem_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![title, content, importance.get(), mem_type.to_string(), now],
            )?;
            fetch(conn, conn.last_insert_rowid())
        })
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<MemoryRow, StoreError> {
        self.db.with_conn(|conn| fetch(conn, id))
    }

    /// Apply a partial update. `created_at` is untouched, so ranking ties
    /// still resolve by original insertion.
    #[instrument(skip(self, update))]
    pub fn update(&self, id: i64, update: MemoryUpdate) -> Result<MemoryRow, StoreError> {
        let now = row_helpers::now();
        self.db.with_tx(|tx| {
            let current = fetch(tx, id)?;
            tx.execute(
                "UPDATE memories
                 SET title = ?1, content = ?2, importance = ?3, mem_type = ?4, updated_at = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    update.title.unwrap_or(current.title),
                    update.content.unwrap_or(current.content),
                    update.importance.unwrap_or(current.importance).get(),
                    update.mem_type.unwrap_or(current.mem_type).to_string(),
                    now,
                    id,
                ],
            )?;
            fetch(tx, id)
        })
    }

    /// The `limit` most important memories, newest first among equals.
    #[instrument(skip(self))]
    pub fn top(&self, limit: u32) -> Result<Vec<MemoryRow>, StoreError> {
        self.db.with_conn(|conn| {
            query(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM memories
                     ORDER BY importance DESC, created_at DESC, id DESC LIMIT ?1"
                ),
                [limit],
            )
        })
    }

    /// Every memory, most important first.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<MemoryRow>, StoreError> {
        self.db.with_conn(|conn| {
            query(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM memories
                     ORDER BY importance DESC, created_at DESC, id DESC"
                ),
                [],
            )
        })
    }

    /// Keyword search on title and content.
    #[instrument(skip(self))]
    pub fn search(&self, keyword: &str, limit: u32) -> Result<Vec<MemoryRow>, StoreError> {
        let pattern = format!("%{}%", row_helpers::escape_like(keyword));
        self.db.with_conn(|conn| {
            query(
                conn,
                &format!(
                    "SELECT {COLUMNS} FROM memories
                     WHERE title LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\'
                     ORDER BY importance DESC, created_at DESC, id DESC LIMIT ?2"
                ),
                rusqlite::params![pattern, limit],
            )
        })
    }
}

fn fetch(conn: &Connection, id: i64) -> Result<MemoryRow, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM memories WHERE id = ?1"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => row_to_memory(row),
        None => Err(StoreError::NotFound(format!("memory {id}"))),
    }
}

fn query<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<MemoryRow>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        results.push(row_to_memory(row)?);
    }
    Ok(results)
}

fn row_to_memory(row: &rusqlite::Row<'_>) -> Result<MemoryRow, StoreError> {
    let importance: f64 = row_helpers::get(row, 3, "memories", "importance")?;
    let mem_type_str: String = row_helpers::get(row, 4, "memories", "mem_type")?;

    Ok(MemoryRow {
        id: row_helpers::get(row, 0, "memories", "id")?,
        title: row_helpers::get(row, 1, "memories", "title")?,
        content: row_helpers::get(row, 2, "memories", "content")?,
        importance: Importance::new(importance).map_err(|e| StoreError::CorruptRow {
            table: "memories",
            column: "importance",
            detail: e.to_string(),
        })?,
        mem_type: row_helpers::parse_enum(&mem_type_str, "memories", "mem_type")?,
        created_at: row_helpers::get(row, 5, "memories", "created_at")?,
        updated_at: row_helpers::get(row, 6, "memories", "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn repo() -> MemoryRepo {
        MemoryRepo::new(Database::in_memory().unwrap())
    }

    fn imp(raw: f64) -> Importance {
        Importance::new(raw).unwrap()
    }

    #[test]
    fn add_and_get() {
        let repo = repo();
        let mem = repo
            .add("Rust", "Ownership prevents data races", imp(0.9), MemoryType::Insight)
            .unwrap();
        let fetched = repo.get(mem.id).unwrap();
        assert_eq!(fetched.title, "Rust");
        assert_eq!(fetched.mem_type, MemoryType::Insight);
        assert_eq!(fetched.importance.get(), 0.9);
    }

    #[test]
    fn importance_out_of_range_rejected() {
        for raw in [-0.1, 1.01, f64::NAN] {
            assert!(matches!(
                Importance::new(raw),
                Err(StoreError::Validation { field: "importance", .. })
            ));
        }
        assert!(Importance::new(0.0).is_ok());
        assert!(Importance::new(1.0).is_ok());
    }

    #[test]
    fn unknown_mem_type_rejected() {
        assert!("opinion".parse::<MemoryType>().is_err());
        assert_eq!(MemoryType::default(), MemoryType::Fact);
    }

    #[test]
    fn get_missing_is_not_found() {
        assert!(matches!(repo().get(7), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn top_orders_by_importance_then_newest() {
        let repo = repo();
        let older_mid = repo.add("a", "a", imp(0.5), MemoryType::Fact).unwrap();
        let high = repo.add("b", "b", imp(0.9), MemoryType::Fact).unwrap();
        let newer_mid = repo.add("c", "c", imp(0.5), MemoryType::Fact).unwrap();
        for i in 0..10 {
            repo.add(&format!("low {i}"), "x", imp(0.1), MemoryType::Fact).unwrap();
        }

        let top = repo.top(10).unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].id, high.id);
        assert_eq!(top[1].id, newer_mid.id);
        assert_eq!(top[2].id, older_mid.id);
    }

    #[test]
    fn lowered_importance_drops_in_ranking() {
        let repo = repo();
        let target = repo.add("target", "x", imp(0.8), MemoryType::Fact).unwrap();
        let mid = repo.add("mid", "x", imp(0.5), MemoryType::Fact).unwrap();
        let low = repo.add("low", "x", imp(0.2), MemoryType::Fact).unwrap();

        let updated = repo
            .update(
                target.id,
                MemoryUpdate {
                    importance: Some(imp(0.3)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.created_at, target.created_at);
        assert_eq!(updated.title, "target");

        let ids: Vec<i64> = repo.top(10).unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![mid.id, target.id, low.id]);
    }

    #[test]
    fn search_matches_title_or_content() {
        let repo = repo();
        repo.add("Tokio runtime", "async executor", imp(0.4), MemoryType::Fact).unwrap();
        repo.add("Threads", "tokio spawn_blocking pool", imp(0.7), MemoryType::Fact).unwrap();
        repo.add("Unrelated", "nothing here", imp(1.0), MemoryType::Fact).unwrap();

        let hits = repo.search("tokio", 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Threads");
    }

    #[test]
    fn search_escapes_wildcards() {
        let repo = repo();
        repo.add("discount", "100% off", imp(0.5), MemoryType::Fact).unwrap();
        repo.add("other", "1000 items", imp(0.5), MemoryType::Fact).unwrap();

        let hits = repo.search("100%", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "discount");
    }

    #[test]
    fn search_respects_limit() {
        let repo = repo();
        for i in 0..8 {
            repo.add(&format!("note {i}"), "shared", imp(0.5), MemoryType::Fact).unwrap();
        }
        assert_eq!(repo.search("shared", 3).unwrap().len(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn top_never_skips_a_more_important_memory(
            scores in proptest::collection::vec(0u8..=10, 0..20)
        ) {
            let repo = repo();
            for (i, s) in scores.iter().enumerate() {
                repo.add(&format!("m{i}"), "x", imp(f64::from(*s) / 10.0), MemoryType::Fact).unwrap();
            }
            let top = repo.top(10).unwrap();
            prop_assert_eq!(top.len(), scores.len().min(10));
            for pair in top.windows(2) {
                prop_assert!(pair[0].importance >= pair[1].importance);
            }
            if let Some(last) = top.last() {
                let strictly_better = scores
                    .iter()
                    .filter(|s| f64::from(**s) / 10.0 > last.importance.get())
                    .count();
                prop_assert!(strictly_better < top.len());
            }
        }
    }

    #[test]
    fn list_returns_everything_by_importance() {
        let repo = repo();
        for i in 0..12 {
            repo.add(&format!("m{i}"), "c", imp(f64::from(i) / 20.0), MemoryType::Fact)
                .unwrap();
        }
        let all = repo.list().unwrap();
        assert_eq!(all.len(), 12);
        assert_eq!(all[0].title, "m11");
        assert_eq!(all[11].title, "m0");
    }
}
