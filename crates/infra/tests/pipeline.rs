//! End-to-end pipeline tests over real SQLite storage: raw events in,
//! canonical records and rollups out.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tempfile::TempDir;

use netlens_core::{
    AggregationService, CanonicalRecordStore, IngestService, KeyValueStore, RawEventStore,
    StatsStore, TransformService,
};
use netlens_domain::constants::{DEFAULT_TRANSFORM_BATCH_SIZE, KV_TRANSFORM_CURSOR};
use netlens_domain::{EventCategory, RawEvent};
use netlens_infra::{
    DbManager, SqliteKeyValueRepository, SqliteRawEventRepository, SqliteRecordRepository,
    SqliteStatsRepository,
};

struct Pipeline {
    _dir: TempDir,
    raw: Arc<SqliteRawEventRepository>,
    records: Arc<SqliteRecordRepository>,
    stats: Arc<SqliteStatsRepository>,
    kv: Arc<SqliteKeyValueRepository>,
    ingest: IngestService,
    transform: TransformService,
    aggregator: Arc<AggregationService>,
}

fn pipeline() -> Pipeline {
    let dir = TempDir::new().unwrap();
    let db = DbManager::new(dir.path().join("netlens.db"), 2).unwrap();
    let raw = Arc::new(SqliteRawEventRepository::new(db.pool()));
    let records = Arc::new(SqliteRecordRepository::new(db.pool()));
    let stats = Arc::new(SqliteStatsRepository::new(db.pool()));
    let kv = Arc::new(SqliteKeyValueRepository::new(db.pool()));

    let aggregator = Arc::new(AggregationService::new(records.clone(), stats.clone()));
    let transform = TransformService::new(
        raw.clone(),
        records.clone(),
        aggregator.clone(),
        kv.clone(),
        DEFAULT_TRANSFORM_BATCH_SIZE,
    );
    let ingest = IngestService::new(raw.clone());

    Pipeline { _dir: dir, raw, records, stats, kv, ingest, transform, aggregator }
}

fn request_payload(url: &str, status: u16, bytes: i64, duration: i64) -> serde_json::Value {
    json!({
        "url": url,
        "method": "GET",
        "type": "xhr",
        "status": status,
        "sizeBytes": bytes,
        "durationMs": duration,
        "fromCache": false
    })
}

/// Raw event with a pinned capture time, so date-based assertions are
/// deterministic.
fn event_at(captured_at: i64, payload: serde_json::Value) -> RawEvent {
    let mut event = RawEvent::new(EventCategory::Request, payload);
    event.captured_at = captured_at;
    event
}

#[tokio::test]
async fn raw_event_flows_into_records_and_rollups() {
    let p = pipeline();

    // 2024-03-01T10:15:00Z
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let ts = date.and_hms_opt(10, 15, 0).unwrap().and_utc().timestamp_millis();
    let event = event_at(ts, request_payload("https://api.example.com/v1/items", 200, 2048, 42));
    p.raw.append(&event).await.unwrap();

    let outcome = p.transform.process_pending().await.unwrap();
    assert_eq!(outcome.processed, 1);
    assert!(outcome.skipped.is_empty());

    let record = p.records.get(&event.id).await.unwrap().unwrap();
    assert_eq!(record.domain, "api.example.com");
    assert_eq!(record.size_bytes, 2048);

    let domains = p.stats.domain_stats().await.unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].domain, "api.example.com");
    assert_eq!(domains[0].count, 1);
    assert_eq!(domains[0].total_bytes, 2048);

    // The hour bucket starting 10:00 carries the delta.
    let hour_start = date.and_hms_opt(10, 0, 0).unwrap().and_utc().timestamp_millis();
    let hourly = p.stats.hourly_stats(hour_start, hour_start + 3_600_000).await.unwrap();
    assert_eq!(hourly.len(), 1);
    assert_eq!(hourly[0].total_bytes, 2048);
    assert_eq!(hourly[0].total_duration_ms, 42);

    // The nightly batch pass sees the same record.
    let daily = p.aggregator.rollup_daily(date).await.unwrap();
    assert_eq!(daily.total_requests, 1);
    assert_eq!(daily.total_bytes, 2048);
    assert_eq!(daily.unique_domains, 1);
    assert_eq!(p.stats.get_daily(date).await.unwrap().unwrap(), daily);
}

#[tokio::test]
async fn reprocessing_never_double_counts() {
    let p = pipeline();

    let ts = 1_700_000_000_000;
    p.raw
        .append(&event_at(ts, request_payload("https://a.com/x", 200, 1000, 10)))
        .await
        .unwrap();

    let first = p.transform.process_pending().await.unwrap();
    assert_eq!(first.processed, 1);

    // Force the transform to walk the same events again.
    p.kv.delete(KV_TRANSFORM_CURSOR).await.unwrap();
    let second = p.transform.process_pending().await.unwrap();
    assert_eq!(second.processed, 1);

    let domains = p.stats.domain_stats().await.unwrap();
    assert_eq!(domains[0].count, 1, "replayed event must not inflate rollups");
    assert_eq!(domains[0].total_bytes, 1000);
}

#[tokio::test]
async fn malformed_events_are_skipped_without_stalling_the_batch() {
    let p = pipeline();

    let ts = 1_700_000_000_000;
    p.raw.append(&event_at(ts, json!({"status": 200}))).await.unwrap();
    p.raw
        .append(&event_at(ts + 1, request_payload("https://b.com/y", 503, 512, 30)))
        .await
        .unwrap();

    let outcome = p.transform.process_pending().await.unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert!(outcome.skipped[0].reason.contains("missing required field"));

    // The cursor moved past the bad event; nothing is pending.
    let again = p.transform.process_pending().await.unwrap();
    assert_eq!(again.processed, 0);
    assert!(again.skipped.is_empty());

    let domains = p.stats.domain_stats().await.unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].domain, "b.com");
    assert_eq!(domains[0].error_count, 1);
}

#[tokio::test]
async fn non_request_categories_are_stored_but_not_transformed() {
    let p = pipeline();

    p.ingest
        .append(EventCategory::WebVital, json!({"metric": "lcp", "value": 2500}))
        .await
        .unwrap();
    p.ingest
        .append(EventCategory::Request, request_payload("https://c.com/z", 200, 64, 5))
        .await
        .unwrap();

    let outcome = p.transform.process_pending().await.unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.skipped.len(), 1);

    // Both raw events stay in the bronze store regardless.
    assert_eq!(p.raw.count().await.unwrap(), 2);
}
