//! Append-only raw event storage (bronze layer).

use async_trait::async_trait;
use rusqlite::{params, Row};
use tokio::task;
use tracing::instrument;

use netlens_core::RawEventStore;
use netlens_domain::{EventCategory, NetLensError, RawEvent, Result, SequencedRawEvent};

use crate::database::manager::{get_conn, DbPool};
use crate::errors::{map_join_error, map_sql_error};

const INSERT_EVENT: &str = "INSERT INTO raw_events (id, category, payload, captured_at)
     VALUES (?1, ?2, ?3, ?4)";

const SELECT_SINCE: &str = "SELECT seq, id, category, payload, captured_at FROM raw_events
     WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2";

const DELETE_BEFORE: &str = "DELETE FROM raw_events WHERE captured_at < ?1";

const COUNT_EVENTS: &str = "SELECT COUNT(*) FROM raw_events";

pub struct SqliteRawEventRepository {
    pool: DbPool,
}

impl SqliteRawEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<SequencedRawEvent> {
    let payload: String = row.get(3)?;
    let payload = serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null);
    let category: String = row.get(2)?;
    let category = EventCategory::parse(&category).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown event category: {category}").into(),
        )
    })?;
    Ok(SequencedRawEvent {
        seq: row.get(0)?,
        event: RawEvent {
            id: row.get(1)?,
            category,
            payload,
            captured_at: row.get(4)?,
        },
    })
}

#[async_trait]
impl RawEventStore for SqliteRawEventRepository {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn append(&self, event: &RawEvent) -> Result<i64> {
        let pool = self.pool.clone();
        let event = event.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let payload = serde_json::to_string(&event.payload)
                .map_err(|e| NetLensError::InvalidInput(format!("unserializable payload: {e}")))?;
            conn.execute(
                INSERT_EVENT,
                params![event.id, event.category.as_str(), payload, event.captured_at],
            )
            .map_err(map_sql_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn fetch_since(&self, seq: i64, limit: usize) -> Result<Vec<SequencedRawEvent>> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            let mut stmt = conn.prepare_cached(SELECT_SINCE).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![seq, limit as i64], map_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn delete_before(&self, captured_before: i64) -> Result<usize> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            conn.execute(DELETE_BEFORE, params![captured_before])
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count(&self) -> Result<i64> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            conn.query_row(COUNT_EVENTS, [], |row| row.get(0))
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DbManager;
    use netlens_domain::EventCategory;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteRawEventRepository) {
        let dir = TempDir::new().unwrap();
        let db = DbManager::new(dir.path().join("test.db"), 2).unwrap();
        (dir, SqliteRawEventRepository::new(db.pool()))
    }

    #[tokio::test]
    async fn append_assigns_increasing_sequence_numbers() {
        let (_dir, repo) = setup();

        let first = repo
            .append(&RawEvent::new(EventCategory::Request, json!({"url": "https://a.com/x"})))
            .await
            .unwrap();
        let second = repo
            .append(&RawEvent::new(EventCategory::WebVital, json!({"metric": "lcp"})))
            .await
            .unwrap();

        assert!(second > first);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn fetch_since_returns_only_later_events_in_order() {
        let (_dir, repo) = setup();

        let mut seqs = Vec::new();
        for i in 0..5 {
            let seq = repo
                .append(&RawEvent::new(EventCategory::Request, json!({"i": i})))
                .await
                .unwrap();
            seqs.push(seq);
        }

        let batch = repo.fetch_since(seqs[1], 10).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].seq, seqs[2]);
        assert!(batch.windows(2).all(|w| w[0].seq < w[1].seq));

        let limited = repo.fetch_since(0, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn delete_before_prunes_old_events() {
        let (_dir, repo) = setup();

        let mut old = RawEvent::new(EventCategory::Request, json!({}));
        old.captured_at = 1_000;
        let mut recent = RawEvent::new(EventCategory::Request, json!({}));
        recent.captured_at = 2_000;

        repo.append(&old).await.unwrap();
        repo.append(&recent).await.unwrap();

        let removed = repo.delete_before(1_500).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
