//! Canonical record storage (silver layer).

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::instrument;

use netlens_core::{CanonicalRecordStore, UpsertOutcome};
use netlens_domain::{CanonicalRecord, RecordFilter, Result};

use crate::database::manager::{get_conn, DbPool};
use crate::errors::{map_join_error, map_sql_error};

const RECORD_COLUMNS: &str = "id, url, method, domain, page_url, resource_type, status, \
     duration_ms, size_bytes, from_cache, timestamp, created_at, updated_at";

const INSERT_RECORD: &str = "INSERT INTO canonical_records (id, url, method, domain, page_url, resource_type, status,
         duration_ms, size_bytes, from_cache, timestamp, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

const UPDATE_RECORD: &str = "UPDATE canonical_records SET url = ?2, method = ?3, domain = ?4, page_url = ?5,
         resource_type = ?6, status = ?7, duration_ms = ?8, size_bytes = ?9,
         from_cache = ?10, timestamp = ?11, updated_at = ?12
     WHERE id = ?1";

pub struct SqliteRecordRepository {
    pool: DbPool,
}

impl SqliteRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<CanonicalRecord> {
    Ok(CanonicalRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        method: row.get(2)?,
        domain: row.get(3)?,
        page_url: row.get(4)?,
        resource_type: row.get(5)?,
        status: row.get::<_, i64>(6)? as u16,
        duration_ms: row.get(7)?,
        size_bytes: row.get(8)?,
        from_cache: row.get(9)?,
        timestamp: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn get_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<CanonicalRecord>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM canonical_records WHERE id = ?1"),
        [id],
        map_row,
    )
    .optional()
}

fn insert(conn: &Connection, record: &CanonicalRecord) -> rusqlite::Result<usize> {
    conn.execute(
        INSERT_RECORD,
        params![
            record.id,
            record.url,
            record.method,
            record.domain,
            record.page_url,
            record.resource_type,
            record.status as i64,
            record.duration_ms,
            record.size_bytes,
            record.from_cache,
            record.timestamp,
            record.created_at,
            record.updated_at,
        ],
    )
}

/// Field-wise equality ignoring `updated_at`, which is rewritten on update.
fn same_content(a: &CanonicalRecord, b: &CanonicalRecord) -> bool {
    let mut b = b.clone();
    b.updated_at = a.updated_at;
    *a == b
}

#[async_trait]
impl CanonicalRecordStore for SqliteRecordRepository {
    #[instrument(skip(self, record), fields(record_id = %record.id))]
    async fn upsert(&self, record: &CanonicalRecord) -> Result<UpsertOutcome> {
        let pool = self.pool.clone();
        let record = record.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            match get_by_id(&conn, &record.id).map_err(map_sql_error)? {
                None => {
                    insert(&conn, &record).map_err(map_sql_error)?;
                    Ok(UpsertOutcome::Inserted)
                }
                Some(existing) if same_content(&existing, &record) => Ok(UpsertOutcome::Unchanged),
                // created_at stays whatever the first insert wrote; the
                // UPDATE never touches that column.
                Some(_) => {
                    conn.execute(
                        UPDATE_RECORD,
                        params![
                            record.id,
                            record.url,
                            record.method,
                            record.domain,
                            record.page_url,
                            record.resource_type,
                            record.status as i64,
                            record.duration_ms,
                            record.size_bytes,
                            record.from_cache,
                            record.timestamp,
                            Utc::now().timestamp_millis(),
                        ],
                    )
                    .map_err(map_sql_error)?;
                    Ok(UpsertOutcome::Updated)
                }
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: &str) -> Result<Option<CanonicalRecord>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            get_by_id(&conn, &id).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_if_absent(&self, record: &CanonicalRecord) -> Result<bool> {
        let pool = self.pool.clone();
        let record = record.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            if get_by_id(&conn, &record.id).map_err(map_sql_error)?.is_some() {
                return Ok(false);
            }
            insert(&conn, &record).map_err(map_sql_error)?;
            Ok(true)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<CanonicalRecord>> {
        let start = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0);
        let end = start + 86_400_000;
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {RECORD_COLUMNS} FROM canonical_records
                     WHERE timestamp >= ?1 AND timestamp < ?2 ORDER BY timestamp ASC"
                ))
                .map_err(map_sql_error)?;
            let rows = stmt.query_map(params![start, end], map_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_created_after(
        &self,
        created_after: i64,
        limit: usize,
    ) -> Result<Vec<CanonicalRecord>> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {RECORD_COLUMNS} FROM canonical_records
                     WHERE created_at > ?1 ORDER BY created_at ASC LIMIT ?2"
                ))
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![created_after, limit as i64], map_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<CanonicalRecord>> {
        let pool = self.pool.clone();
        let filter = filter.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;

            let mut sql = format!(
                "SELECT {RECORD_COLUMNS} FROM canonical_records WHERE 1 = 1"
            );
            let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(domain) = &filter.domain {
                sql.push_str(&format!(" AND domain = ?{}", args.len() + 1));
                args.push(Box::new(domain.clone()));
            }
            if let Some(page_url) = &filter.page_url {
                sql.push_str(&format!(" AND page_url = ?{}", args.len() + 1));
                args.push(Box::new(page_url.clone()));
            }
            if let Some(resource_type) = &filter.resource_type {
                sql.push_str(&format!(" AND resource_type = ?{}", args.len() + 1));
                args.push(Box::new(resource_type.clone()));
            }
            if let Some(start) = filter.start {
                sql.push_str(&format!(" AND timestamp >= ?{}", args.len() + 1));
                args.push(Box::new(start));
            }
            if let Some(end) = filter.end {
                sql.push_str(&format!(" AND timestamp < ?{}", args.len() + 1));
                args.push(Box::new(end));
            }
            sql.push_str(" ORDER BY timestamp DESC");
            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT ?{}", args.len() + 1));
                args.push(Box::new(limit as i64));
            }

            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let params = rusqlite::params_from_iter(args.iter().map(|a| a.as_ref()));
            let rows = stmt.query_map(params, map_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}
