//! Port interfaces for the raw event store

use async_trait::async_trait;
use netlens_domain::{RawEvent, Result, SequencedRawEvent};

/// Append-only store of captured telemetry events.
///
/// Events are immutable once written; the store assigns each appended event
/// a monotonically increasing sequence number that drives the transform
/// cursor.
#[async_trait]
pub trait RawEventStore: Send + Sync {
    /// Append an event and return its sequence number.
    async fn append(&self, event: &RawEvent) -> Result<i64>;

    /// Fetch events with a sequence number strictly greater than `seq`,
    /// ordered by sequence, capped at `limit`.
    async fn fetch_since(&self, seq: i64, limit: usize) -> Result<Vec<SequencedRawEvent>>;

    /// Delete events captured before the given epoch-millisecond timestamp.
    /// Returns the number of rows removed.
    async fn delete_before(&self, captured_before: i64) -> Result<usize>;

    /// Total number of stored events.
    async fn count(&self) -> Result<i64>;
}
