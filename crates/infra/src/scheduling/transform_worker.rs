//! Background transform worker.
//!
//! Drains pending raw events into canonical records. Wakes on the ingest
//! "inserted" signal for low latency, with a fallback interval that picks up
//! anything a missed wakeup would leave behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use netlens_core::TransformService;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the transform worker
#[derive(Debug, Clone)]
pub struct TransformWorkerConfig {
    /// Catch-up interval when no wakeup signal arrives
    pub fallback_interval: Duration,
}

impl Default for TransformWorkerConfig {
    fn default() -> Self {
        Self { fallback_interval: Duration::from_secs(60) }
    }
}

pub struct TransformWorker {
    transform: Arc<TransformService>,
    signal: Arc<Notify>,
    config: TransformWorkerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl TransformWorker {
    pub fn new(
        transform: Arc<TransformService>,
        signal: Arc<Notify>,
        config: TransformWorkerConfig,
    ) -> Self {
        Self {
            transform,
            signal,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the worker. Idempotent: restarts any running task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            debug!("transform worker already running, restarting");
            self.stop().await?;
        }

        self.cancellation_token = CancellationToken::new();
        let transform = Arc::clone(&self.transform);
        let signal = Arc::clone(&self.signal);
        let fallback = self.config.fallback_interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::transform_loop(transform, signal, fallback, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!(
            fallback_secs = self.config.fallback_interval.as_secs(),
            "transform worker started"
        );
        Ok(())
    }

    /// Stop the worker. No-op when idle.
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

        info!("transform worker stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn transform_loop(
        transform: Arc<TransformService>,
        signal: Arc<Notify>,
        fallback: Duration,
        cancel: CancellationToken,
    ) {
        // Drain whatever accumulated before the worker came up.
        Self::run_pass(&transform).await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("transform loop cancelled");
                    break;
                }
                _ = signal.notified() => {
                    Self::run_pass(&transform).await;
                }
                _ = tokio::time::sleep(fallback) => {
                    Self::run_pass(&transform).await;
                }
            }
        }
    }

    async fn run_pass(transform: &Arc<TransformService>) {
        match transform.process_pending().await {
            Ok(outcome) if outcome.processed > 0 || !outcome.skipped.is_empty() => {
                debug!(
                    processed = outcome.processed,
                    skipped = outcome.skipped.len(),
                    "transform pass complete"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "transform pass failed"),
        }
    }
}

impl Drop for TransformWorker {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}
