//! Port interfaces for the canonical record store

use async_trait::async_trait;
use chrono::NaiveDate;
use netlens_domain::{CanonicalRecord, RecordFilter, Result};

/// Result of an upsert keyed on record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row with this id existed before
    Inserted,
    /// A row existed and its derived fields changed
    Updated,
    /// A row existed and was byte-for-byte identical (idempotent re-run)
    Unchanged,
}

/// Store of validated canonical request records.
#[async_trait]
pub trait CanonicalRecordStore: Send + Sync {
    /// Upsert a record keyed on `id`.
    ///
    /// An existing identical row (ignoring `updated_at`) must be left
    /// untouched and reported as [`UpsertOutcome::Unchanged`]; a changed row
    /// is rewritten with a fresh `updated_at`.
    async fn upsert(&self, record: &CanonicalRecord) -> Result<UpsertOutcome>;

    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<Option<CanonicalRecord>>;

    /// Insert only when no row with the same id exists (existence-check
    /// merge, local wins). Returns `true` when the row was inserted.
    async fn insert_if_absent(&self, record: &CanonicalRecord) -> Result<bool>;

    /// All records whose `timestamp` falls on the given calendar date (UTC).
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<CanonicalRecord>>;

    /// Records with `created_at` strictly greater than `created_after`,
    /// ordered by `created_at`, capped at `limit`. Sync upload path.
    async fn find_created_after(
        &self,
        created_after: i64,
        limit: usize,
    ) -> Result<Vec<CanonicalRecord>>;

    /// Dashboard read path.
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<CanonicalRecord>>;
}
