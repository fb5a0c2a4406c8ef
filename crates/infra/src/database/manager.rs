//! SQLite connection management.
//!
//! `DbManager` owns an r2d2 pool over a file-backed SQLite database, applies
//! the schema on startup, and hands clones of the pool to the repositories.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, info};

use netlens_domain::{NetLensError, Result};

use crate::errors::map_sql_error;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Current schema version. Bump when schema.sql changes shape.
pub const SCHEMA_VERSION: i64 = 1;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Owns the SQLite pool and schema lifecycle.
#[derive(Clone)]
pub struct DbManager {
    pool: DbPool,
}

impl DbManager {
    /// Open (or create) the database at `path` and apply migrations.
    pub fn new(path: impl AsRef<Path>, pool_size: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e| NetLensError::Database(format!("failed to build pool: {e}")))?;

        let db = Self { pool };
        db.run_migrations()?;
        info!(path = %path.as_ref().display(), "database ready");
        Ok(db)
    }

    /// Open an in-memory database. Pool size is forced to 1 so every
    /// repository sees the same connection.
    pub fn in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| NetLensError::Database(format!("failed to build pool: {e}")))?;
        let db = Self { pool };
        db.run_migrations()?;
        Ok(db)
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;

        let current: Option<i64> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .map_err(map_sql_error)?;

        if current.unwrap_or(0) < SCHEMA_VERSION {
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![SCHEMA_VERSION, chrono::Utc::now().timestamp_millis()],
            )
            .map_err(map_sql_error)?;
            debug!(version = SCHEMA_VERSION, "applied schema");
        }
        Ok(())
    }

    /// Cheap liveness probe used by maintenance.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(map_sql_error)
    }

    /// Reclaim space after large deletes.
    pub fn vacuum(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("VACUUM").map_err(map_sql_error)
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| NetLensError::Database(format!("failed to get connection: {e}")))
    }
}

/// Grab a pooled connection, mapping pool errors into the domain error.
pub(crate) fn get_conn(
    pool: &DbPool,
) -> std::result::Result<r2d2::PooledConnection<SqliteConnectionManager>, NetLensError> {
    pool.get()
        .map_err(|e| NetLensError::Database(format!("failed to get connection: {e}")))
}

#[allow(dead_code)]
pub(crate) fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_schema_on_fresh_database() {
        let dir = TempDir::new().unwrap();
        let db = DbManager::new(dir.path().join("netlens.db"), 4).unwrap();

        let conn = db.conn().unwrap();
        for table in [
            "raw_events",
            "canonical_records",
            "domain_stats",
            "resource_stats",
            "hourly_stats",
            "daily_analytics",
            "app_state",
        ] {
            assert!(table_exists(&conn, table).unwrap(), "missing table {table}");
        }
    }

    #[test]
    fn records_schema_version() {
        let db = DbManager::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn reopening_existing_database_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("netlens.db");
        drop(DbManager::new(&path, 2).unwrap());
        let db = DbManager::new(&path, 2).unwrap();
        db.health_check().unwrap();
    }
}
