//! Pooled SQLite access for one agent database.
//!
//! Every connection handed out by the pool has already run
//! [`schema::connection_pragmas`], so readers on other connections never
//! block behind an in-flight writer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::schema;

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Configuration for a per-agent connection pool.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 8).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 10000).
    pub busy_timeout_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&schema::connection_pragmas(self.busy_timeout_ms))
    }
}

/// Cheaply cloneable handle to an agent database pool.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
    path: PathBuf,
}

impl Database {
    /// Open or create a database at the given path and bootstrap its schema.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }

        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_timeout(Duration::from_secs(5))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: config.busy_timeout_ms,
            }))
            .build(SqliteConnectionManager::file(path))?;

        let db = Self {
            pool,
            path: path.to_owned(),
        };
        db.bootstrap()?;
        info!(path = %path.display(), pool_size = config.pool_size, "database opened");
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    ///
    /// Each in-memory connection is its own database, so the pool holds
    /// exactly one connection that is never recycled.
    pub fn in_memory() -> Result<Self, StoreError> {
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(Duration::from_secs(5))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: ConnectionConfig::default().busy_timeout_ms,
            }))
            .build(SqliteConnectionManager::memory())?;

        let db = Self {
            pool,
            path: PathBuf::from(":memory:"),
        };
        db.bootstrap()?;
        Ok(db)
    }

    fn bootstrap(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(|e| StoreError::Database(format!("schema: {e}")))?;

            let version: Option<u32> = conn
                .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                    row.get(0)
                })
                .ok();

            if version.is_none() {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    [schema::SCHEMA_VERSION],
                )
                .map_err(|e| StoreError::Database(format!("schema version: {e}")))?;
                debug!(version = schema::SCHEMA_VERSION, "schema bootstrapped");
            }
            Ok(())
        })
    }

    /// Execute a closure with a pooled connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.pool.get()?;
        f(&conn)
    }

    /// Execute a closure inside one transaction; commits on `Ok`, rolls
    /// back on `Err`.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}
