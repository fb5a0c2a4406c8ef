//! Rollup storage (gold layer).

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::instrument;

use netlens_core::StatsStore;
use netlens_domain::{
    DailyAnalytics, DomainStat, HourlyStat, NetLensError, ResourceStat, Result, StatDelta,
};

use crate::database::manager::{get_conn, DbPool};
use crate::errors::{map_join_error, map_sql_error};

const APPLY_DOMAIN: &str = "INSERT INTO domain_stats (domain, count, total_bytes, total_duration_ms, error_count)
     VALUES (?1, 1, ?2, ?3, ?4)
     ON CONFLICT(domain) DO UPDATE SET
         count = count + 1,
         total_bytes = total_bytes + excluded.total_bytes,
         total_duration_ms = total_duration_ms + excluded.total_duration_ms,
         error_count = error_count + excluded.error_count";

const APPLY_RESOURCE: &str = "INSERT INTO resource_stats (resource_type, count, total_bytes, total_duration_ms, error_count)
     VALUES (?1, 1, ?2, ?3, ?4)
     ON CONFLICT(resource_type) DO UPDATE SET
         count = count + 1,
         total_bytes = total_bytes + excluded.total_bytes,
         total_duration_ms = total_duration_ms + excluded.total_duration_ms,
         error_count = error_count + excluded.error_count";

const APPLY_HOURLY: &str = "INSERT INTO hourly_stats (hour_bucket, count, total_bytes, total_duration_ms, error_count)
     VALUES (?1, 1, ?2, ?3, ?4)
     ON CONFLICT(hour_bucket) DO UPDATE SET
         count = count + 1,
         total_bytes = total_bytes + excluded.total_bytes,
         total_duration_ms = total_duration_ms + excluded.total_duration_ms,
         error_count = error_count + excluded.error_count";

const UPSERT_DAILY: &str = "INSERT OR REPLACE INTO daily_analytics
         (date, total_requests, total_bytes, avg_duration_ms, error_rate, unique_domains, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub struct SqliteStatsRepository {
    pool: DbPool,
}

impl SqliteStatsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_daily(row: &Row<'_>) -> rusqlite::Result<DailyAnalytics> {
    let date: String = row.get(0)?;
    let date = date.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("bad date {date}: {e}").into(),
        )
    })?;
    Ok(DailyAnalytics {
        date,
        total_requests: row.get(1)?,
        total_bytes: row.get(2)?,
        avg_duration_ms: row.get(3)?,
        error_rate: row.get(4)?,
        unique_domains: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[async_trait]
impl StatsStore for SqliteStatsRepository {
    #[instrument(skip(self, delta), fields(domain = %delta.domain))]
    async fn apply_delta(&self, delta: &StatDelta) -> Result<()> {
        let pool = self.pool.clone();
        let delta = delta.clone();
        task::spawn_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let error = i64::from(delta.is_error);

            let tx = conn
                .transaction()
                .map_err(|e| NetLensError::Database(format!("failed to open transaction: {e}")))?;
            tx.execute(
                APPLY_DOMAIN,
                params![delta.domain, delta.bytes, delta.duration_ms, error],
            )
            .map_err(map_sql_error)?;
            tx.execute(
                APPLY_RESOURCE,
                params![delta.resource_type, delta.bytes, delta.duration_ms, error],
            )
            .map_err(map_sql_error)?;
            tx.execute(
                APPLY_HOURLY,
                params![delta.hour_bucket, delta.bytes, delta.duration_ms, error],
            )
            .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, row), fields(date = %row.date))]
    async fn upsert_daily(&self, row: &DailyAnalytics) -> Result<()> {
        let pool = self.pool.clone();
        let row = row.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            conn.execute(
                UPSERT_DAILY,
                params![
                    row.date.to_string(),
                    row.total_requests,
                    row.total_bytes,
                    row.avg_duration_ms,
                    row.error_rate,
                    row.unique_domains,
                    row.created_at,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn daily_created_after(
        &self,
        created_after: i64,
        limit: usize,
    ) -> Result<Vec<DailyAnalytics>> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let mut stmt = conn
                .prepare_cached(
                    "SELECT date, total_requests, total_bytes, avg_duration_ms, error_rate,
                            unique_domains, created_at
                     FROM daily_analytics
                     WHERE created_at > ?1 ORDER BY created_at ASC LIMIT ?2",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![created_after, limit as i64], map_daily)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_daily(&self, date: NaiveDate) -> Result<Option<DailyAnalytics>> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            conn.query_row(
                "SELECT date, total_requests, total_bytes, avg_duration_ms, error_rate,
                        unique_domains, created_at
                 FROM daily_analytics WHERE date = ?1",
                [date.to_string()],
                map_daily,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn domain_stats(&self) -> Result<Vec<DomainStat>> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let mut stmt = conn
                .prepare_cached(
                    "SELECT domain, count, total_bytes, total_duration_ms, error_count
                     FROM domain_stats ORDER BY count DESC",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(DomainStat {
                        domain: row.get(0)?,
                        count: row.get(1)?,
                        total_bytes: row.get(2)?,
                        total_duration_ms: row.get(3)?,
                        error_count: row.get(4)?,
                    })
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn resource_stats(&self) -> Result<Vec<ResourceStat>> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let mut stmt = conn
                .prepare_cached(
                    "SELECT resource_type, count, total_bytes, total_duration_ms, error_count
                     FROM resource_stats ORDER BY count DESC",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ResourceStat {
                        resource_type: row.get(0)?,
                        count: row.get(1)?,
                        total_bytes: row.get(2)?,
                        total_duration_ms: row.get(3)?,
                        error_count: row.get(4)?,
                    })
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn hourly_stats(&self, start: i64, end: i64) -> Result<Vec<HourlyStat>> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let mut stmt = conn
                .prepare_cached(
                    "SELECT hour_bucket, count, total_bytes, total_duration_ms, error_count
                     FROM hourly_stats
                     WHERE hour_bucket >= ?1 AND hour_bucket < ?2 ORDER BY hour_bucket ASC",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![start, end], |row| {
                    Ok(HourlyStat {
                        hour_bucket: row.get(0)?,
                        count: row.get(1)?,
                        total_bytes: row.get(2)?,
                        total_duration_ms: row.get(3)?,
                        error_count: row.get(4)?,
                    })
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}
