//! Nightly rollup scheduler.
//!
//! Self-re-arming one-shot chain: sleep until the next local midnight, roll
//! up the day that just ended, re-arm. Re-computing the delay from the clock
//! on every arm keeps the chain midnight-aligned even when a run is late.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Local, TimeZone};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use netlens_core::AggregationService;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

pub struct RollupScheduler {
    aggregator: Arc<AggregationService>,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl RollupScheduler {
    pub fn new(aggregator: Arc<AggregationService>) -> Self {
        Self {
            aggregator,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the midnight chain. Idempotent: restarts any running task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            debug!("rollup scheduler already running, restarting");
            self.stop().await?;
        }

        self.cancellation_token = CancellationToken::new();
        let aggregator = Arc::clone(&self.aggregator);
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::rollup_loop(aggregator, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!("rollup scheduler started");
        Ok(())
    }

    /// Stop the chain. No-op when idle.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Ok(());
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;
        }

        info!("rollup scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn rollup_loop(aggregator: Arc<AggregationService>, cancel: CancellationToken) {
        loop {
            let delay = next_midnight_delay(Local::now());
            debug!(delay_secs = delay.as_secs(), "armed for next midnight rollup");

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("rollup loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    // The day that just ended.
                    let Some(yesterday) = Local::now().date_naive().checked_sub_days(Days::new(1))
                    else {
                        warn!("could not compute previous day, skipping rollup");
                        continue;
                    };
                    match aggregator.rollup_daily(yesterday).await {
                        Ok(row) => info!(
                            date = %yesterday,
                            total_requests = row.total_requests,
                            "nightly rollup complete"
                        ),
                        Err(e) => warn!(date = %yesterday, error = %e, "nightly rollup failed"),
                    }
                }
            }
        }
    }
}

/// Duration from `now` until the next local midnight.
pub(crate) fn next_midnight_delay<Tz: TimeZone>(now: DateTime<Tz>) -> Duration {
    const FALLBACK: Duration = Duration::from_secs(24 * 60 * 60);

    let Some(tomorrow) = now.date_naive().succ_opt() else {
        return FALLBACK;
    };
    let Some(midnight) = tomorrow.and_hms_opt(0, 0, 0) else {
        return FALLBACK;
    };
    // DST gaps can make local midnight ambiguous or nonexistent.
    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(next) => (next - now).to_std().unwrap_or(Duration::from_secs(1)),
        None => FALLBACK,
    }
}

impl Drop for RollupScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}
