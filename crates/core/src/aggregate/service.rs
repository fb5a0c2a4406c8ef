//! Aggregation service: incremental rollups and the nightly daily pass.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use netlens_domain::{CanonicalRecord, DailyAnalytics, Result, StatDelta};
use tracing::{info, instrument};

use super::ports::StatsStore;
use crate::transform::ports::CanonicalRecordStore;

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Maintains the gold-layer rollups.
pub struct AggregationService {
    records: Arc<dyn CanonicalRecordStore>,
    stats: Arc<dyn StatsStore>,
}

impl AggregationService {
    pub fn new(records: Arc<dyn CanonicalRecordStore>, stats: Arc<dyn StatsStore>) -> Self {
        Self { records, stats }
    }

    /// Incremental mode: fold one new canonical record into the rollups.
    ///
    /// The transform layer guarantees this is called at most once per
    /// record; the arithmetic here is add-only and carries no dedup.
    pub async fn on_new_record(&self, record: &CanonicalRecord) -> Result<()> {
        self.stats.apply_delta(&delta_for(record)).await
    }

    /// Batch mode: recompute the analytics row for one calendar date from a
    /// full scan of that day's canonical records.
    ///
    /// Averages and rates are computed here rather than incrementally
    /// because they are not associative under per-record updates. The write
    /// replaces any existing row, so re-running for backfill is safe.
    #[instrument(skip(self))]
    pub async fn rollup_daily(&self, date: NaiveDate) -> Result<DailyAnalytics> {
        let records = self.records.find_by_date(date).await?;

        let total_requests = records.len() as i64;
        let total_bytes: i64 = records.iter().map(|r| r.size_bytes).sum();
        let total_duration: i64 = records.iter().map(|r| r.duration_ms).sum();
        let error_count = records.iter().filter(|r| r.is_error()).count() as i64;
        let unique_domains =
            records.iter().map(|r| r.domain.as_str()).collect::<HashSet<_>>().len() as i64;

        let (avg_duration_ms, error_rate) = if total_requests > 0 {
            (
                total_duration as f64 / total_requests as f64,
                error_count as f64 / total_requests as f64,
            )
        } else {
            (0.0, 0.0)
        };

        let row = DailyAnalytics {
            date,
            total_requests,
            total_bytes,
            avg_duration_ms,
            error_rate,
            unique_domains,
            created_at: Utc::now().timestamp_millis(),
        };

        self.stats.upsert_daily(&row).await?;
        info!(
            date = %date,
            total_requests,
            unique_domains,
            "daily rollup written"
        );
        Ok(row)
    }
}

/// Compute the add-only delta a record contributes to each rollup bucket.
pub fn delta_for(record: &CanonicalRecord) -> StatDelta {
    StatDelta {
        domain: record.domain.clone(),
        resource_type: record.resource_type.clone(),
        hour_bucket: hour_bucket(record.timestamp),
        bytes: record.size_bytes,
        duration_ms: record.duration_ms,
        is_error: record.is_error(),
    }
}

/// Truncate an epoch-millisecond timestamp to the start of its hour.
pub fn hour_bucket(timestamp_ms: i64) -> i64 {
    timestamp_ms - timestamp_ms.rem_euclid(HOUR_MS)
}
