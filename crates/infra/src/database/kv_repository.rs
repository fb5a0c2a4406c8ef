//! Key/value state storage.
//!
//! Backs the sync cursor, the transform cursor, the persisted auth session
//! and synced configuration entries.

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use tokio::task;

use netlens_core::KeyValueStore;
use netlens_domain::Result;

use crate::database::manager::{get_conn, DbPool};
use crate::errors::{map_join_error, map_sql_error};

pub struct SqliteKeyValueRepository {
    pool: DbPool,
}

impl SqliteKeyValueRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let pool = self.pool.clone();
        let key = key.to_string();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            conn.query_row("SELECT value FROM app_state WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let pool = self.pool.clone();
        let key = key.to_string();
        let value = value.to_string();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            conn.execute(
                "INSERT OR REPLACE INTO app_state (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let pool = self.pool.clone();
        let key = key.to_string();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            conn.execute("DELETE FROM app_state WHERE key = ?1", [key])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let pool = self.pool.clone();
        // LIKE treats % and _ as wildcards, escape them in the prefix.
        let pattern = format!(
            "{}%",
            prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let mut stmt = conn
                .prepare_cached(
                    "SELECT key, value FROM app_state
                     WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key ASC",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map([pattern], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}
