//! Port interfaces for the rollup store

use async_trait::async_trait;
use chrono::NaiveDate;
use netlens_domain::{DailyAnalytics, DomainStat, HourlyStat, ResourceStat, Result, StatDelta};

/// Store of pre-aggregated rollups.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Apply an add-only delta to the domain, resource-type and hourly
    /// rollups in one atomic step. Callers guarantee at most one delta per
    /// canonical record; there is no dedup at this layer.
    async fn apply_delta(&self, delta: &StatDelta) -> Result<()>;

    /// Write a daily analytics row, replacing any existing row for the same
    /// date (safe for backfill and correction re-runs).
    async fn upsert_daily(&self, row: &DailyAnalytics) -> Result<()>;

    /// Daily rows with `created_at` strictly greater than `created_after`,
    /// capped at `limit`. Sync upload path.
    async fn daily_created_after(
        &self,
        created_after: i64,
        limit: usize,
    ) -> Result<Vec<DailyAnalytics>>;

    /// Fetch the daily row for a date, if computed.
    async fn get_daily(&self, date: NaiveDate) -> Result<Option<DailyAnalytics>>;

    /// All per-domain rollups.
    async fn domain_stats(&self) -> Result<Vec<DomainStat>>;

    /// All per-resource-type rollups.
    async fn resource_stats(&self) -> Result<Vec<ResourceStat>>;

    /// Hourly rollups with bucket in `[start, end)` (epoch ms).
    async fn hourly_stats(&self, start: i64, end: i64) -> Result<Vec<HourlyStat>>;
}
