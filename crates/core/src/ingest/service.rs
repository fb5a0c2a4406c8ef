//! Collector-facing ingest service.
//!
//! Wraps the raw event store with the "bronze inserted" wakeup signal the
//! transform loop waits on. The signal is a typed [`Notify`] handle rather
//! than a stringly-named event bus, so the only possible subscriber is the
//! component holding the handle.

use std::sync::Arc;

use netlens_domain::{EventCategory, RawEvent, Result};
use tokio::sync::Notify;
use tracing::{debug, instrument};

use super::ports::RawEventStore;

/// Entry point for the external capture component.
pub struct IngestService {
    raw: Arc<dyn RawEventStore>,
    inserted: Arc<Notify>,
}

impl IngestService {
    pub fn new(raw: Arc<dyn RawEventStore>) -> Self {
        Self { raw, inserted: Arc::new(Notify::new()) }
    }

    /// Append a captured event and return its id.
    ///
    /// Fire-and-forget from the collector's point of view: no transformation
    /// happens here, only the durable append and the transform wakeup.
    #[instrument(skip(self, payload), fields(category = category.as_str()))]
    pub async fn append(
        &self,
        category: EventCategory,
        payload: serde_json::Value,
    ) -> Result<String> {
        let event = RawEvent::new(category, payload);
        let seq = self.raw.append(&event).await?;
        debug!(event_id = %event.id, seq, "raw event appended");

        self.inserted.notify_one();
        Ok(event.id)
    }

    /// Handle the transform loop awaits for new-event wakeups.
    pub fn inserted_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.inserted)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use netlens_domain::SequencedRawEvent;
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MockRawStore {
        events: Mutex<Vec<RawEvent>>,
    }

    #[async_trait]
    impl RawEventStore for MockRawStore {
        async fn append(&self, event: &RawEvent) -> Result<i64> {
            let mut events = self.events.lock().await;
            events.push(event.clone());
            Ok(events.len() as i64)
        }

        async fn fetch_since(&self, seq: i64, limit: usize) -> Result<Vec<SequencedRawEvent>> {
            let events = self.events.lock().await;
            Ok(events
                .iter()
                .enumerate()
                .map(|(idx, event)| SequencedRawEvent {
                    seq: idx as i64 + 1,
                    event: event.clone(),
                })
                .filter(|entry| entry.seq > seq)
                .take(limit)
                .collect())
        }

        async fn delete_before(&self, _captured_before: i64) -> Result<usize> {
            Ok(0)
        }

        async fn count(&self) -> Result<i64> {
            Ok(self.events.lock().await.len() as i64)
        }
    }

    #[tokio::test]
    async fn append_stores_event_and_notifies() {
        let store = Arc::new(MockRawStore::default());
        let service = IngestService::new(store.clone());
        let signal = service.inserted_signal();

        let id = service
            .append(EventCategory::Request, serde_json::json!({"url": "https://a.com/x"}))
            .await
            .unwrap();

        assert!(!id.is_empty());
        assert_eq!(store.count().await.unwrap(), 1);

        // The wakeup permit must already be stored
        tokio::time::timeout(std::time::Duration::from_millis(50), signal.notified())
            .await
            .expect("inserted signal fired");
    }
}
