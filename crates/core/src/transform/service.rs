//! Incremental transform service.
//!
//! Reads raw events past the persisted transform cursor, normalizes them
//! into canonical records and feeds freshly inserted records to the
//! aggregation layer. Re-running over already-processed events is a no-op:
//! upserts come back [`UpsertOutcome::Unchanged`] and no rollup deltas are
//! applied.

use std::sync::Arc;

use netlens_domain::constants::KV_TRANSFORM_CURSOR;
use netlens_domain::Result;
use tracing::{debug, info, instrument, warn};

use super::normalize::{normalize, status_class, SkipReason};
use super::ports::{CanonicalRecordStore, UpsertOutcome};
use crate::aggregate::service::AggregationService;
use crate::ingest::ports::RawEventStore;
use crate::kv_ports::KeyValueStore;

/// Outcome of one transform pass.
#[derive(Debug, Default)]
pub struct TransformOutcome {
    /// Records upserted (inserted, updated or confirmed unchanged)
    pub processed: usize,
    /// Events rejected by validation, with reasons
    pub skipped: Vec<SkipReason>,
}

/// Validate-and-enrich stage between the raw store and the rollups.
pub struct TransformService {
    raw: Arc<dyn RawEventStore>,
    records: Arc<dyn CanonicalRecordStore>,
    aggregator: Arc<AggregationService>,
    kv: Arc<dyn KeyValueStore>,
    batch_size: usize,
}

impl TransformService {
    pub fn new(
        raw: Arc<dyn RawEventStore>,
        records: Arc<dyn CanonicalRecordStore>,
        aggregator: Arc<AggregationService>,
        kv: Arc<dyn KeyValueStore>,
        batch_size: usize,
    ) -> Self {
        Self { raw, records, aggregator, kv, batch_size }
    }

    /// Process all pending raw events, one batch at a time, and return the
    /// combined outcome.
    #[instrument(skip(self))]
    pub async fn process_pending(&self) -> Result<TransformOutcome> {
        let mut outcome = TransformOutcome::default();

        loop {
            let cursor = self.load_cursor().await?;
            let batch = self.process_since(cursor).await?;
            if batch.processed == 0 && batch.skipped.is_empty() {
                break;
            }
            outcome.processed += batch.processed;
            outcome.skipped.extend(batch.skipped);
        }

        if outcome.processed > 0 || !outcome.skipped.is_empty() {
            info!(
                processed = outcome.processed,
                skipped = outcome.skipped.len(),
                "transform pass completed"
            );
        }
        Ok(outcome)
    }

    /// Process one batch of raw events past `cursor` and advance the stored
    /// cursor to the last sequence seen.
    #[instrument(skip(self))]
    pub async fn process_since(&self, cursor: i64) -> Result<TransformOutcome> {
        let events = self.raw.fetch_since(cursor, self.batch_size).await?;
        let mut outcome = TransformOutcome::default();

        let Some(last_seq) = events.last().map(|entry| entry.seq) else {
            return Ok(outcome);
        };

        for entry in events {
            match normalize(&entry.event) {
                Ok(record) => {
                    let upsert = self.records.upsert(&record).await?;
                    if upsert == UpsertOutcome::Inserted {
                        debug!(
                            record_id = %record.id,
                            domain = %record.domain,
                            class = status_class(record.status),
                            "record inserted"
                        );
                        self.aggregator.on_new_record(&record).await?;
                    } else {
                        debug!(record_id = %record.id, ?upsert, "record already present");
                    }
                    outcome.processed += 1;
                }
                Err(reason) => {
                    warn!(event_id = %entry.event.id, reason = %reason, "event skipped");
                    outcome.skipped.push(SkipReason { event_id: entry.event.id.clone(), reason });
                }
            }
        }

        self.store_cursor(last_seq).await?;
        Ok(outcome)
    }

    async fn load_cursor(&self) -> Result<i64> {
        let value = self.kv.get(KV_TRANSFORM_CURSOR).await?;
        Ok(value.and_then(|raw| raw.parse::<i64>().ok()).unwrap_or(0))
    }

    async fn store_cursor(&self, seq: i64) -> Result<()> {
        self.kv.set(KV_TRANSFORM_CURSOR, &seq.to_string()).await
    }
}
