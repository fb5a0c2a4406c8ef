//! Rollup statistics (gold layer)
//!
//! Incremental rollups are maintained with add-only arithmetic as canonical
//! records arrive; daily analytics are computed in one batch pass per
//! calendar date because averages are not associative under incremental
//! updates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-domain rollup counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainStat {
    pub domain: String,
    pub count: i64,
    pub total_bytes: i64,
    pub total_duration_ms: i64,
    pub error_count: i64,
}

/// Per-resource-type rollup counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceStat {
    pub resource_type: String,
    pub count: i64,
    pub total_bytes: i64,
    pub total_duration_ms: i64,
    pub error_count: i64,
}

/// Per-hour rollup counters, keyed by the hour bucket in epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourlyStat {
    /// Start of the hour in epoch milliseconds
    pub hour_bucket: i64,
    pub count: i64,
    pub total_bytes: i64,
    pub total_duration_ms: i64,
    pub error_count: i64,
}

/// One batch-computed analytics row per calendar date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyAnalytics {
    pub date: NaiveDate,
    pub total_requests: i64,
    pub total_bytes: i64,
    pub avg_duration_ms: f64,
    /// Errors divided by total requests; 0.0 for an empty day
    pub error_rate: f64,
    pub unique_domains: i64,
    /// Rollup computation time in epoch milliseconds
    pub created_at: i64,
}

/// Add-only delta applied to the domain, resource-type and hourly rollups
/// for a single new canonical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatDelta {
    pub domain: String,
    pub resource_type: String,
    pub hour_bucket: i64,
    pub bytes: i64,
    pub duration_ms: i64,
    pub is_error: bool,
}
