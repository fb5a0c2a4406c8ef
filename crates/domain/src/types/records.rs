//! Canonical request records (silver layer)

use serde::{Deserialize, Serialize};

/// Validated and enriched request record, derived deterministically from
/// exactly one [`RawEvent`](super::events::RawEvent).
///
/// Upserted keyed on `id`; timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub id: String,
    pub url: String,
    pub method: String,
    /// Host derived from `url`
    pub domain: String,
    /// Page the request originated from, when known
    pub page_url: Option<String>,
    /// Resource type bucket (script, stylesheet, xhr, ...)
    pub resource_type: String,
    /// HTTP status code; 0 when the request never completed
    pub status: u16,
    pub duration_ms: i64,
    pub size_bytes: i64,
    pub from_cache: bool,
    /// Capture time of the underlying event
    pub timestamp: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CanonicalRecord {
    /// Whether this record counts towards error rollups.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Filter for the dashboard read path over canonical records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    pub domain: Option<String>,
    pub page_url: Option<String>,
    pub resource_type: Option<String>,
    /// Inclusive lower bound on `timestamp` (epoch ms)
    pub start: Option<i64>,
    /// Exclusive upper bound on `timestamp` (epoch ms)
    pub end: Option<i64>,
    pub limit: Option<usize>,
}
