//! Storage maintenance scheduler.
//!
//! Long-period loop that probes database health, trims raw events past the
//! retention window and reclaims space after large deletes. Every step is
//! fire-and-log; a failed pass never stops the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use netlens_core::RawEventStore;
use netlens_domain::constants::{DEFAULT_MAINTENANCE_INTERVAL_SECS, DEFAULT_RAW_RETENTION_DAYS};

use crate::database::DbManager;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Configuration for the maintenance scheduler
#[derive(Debug, Clone)]
pub struct MaintenanceSchedulerConfig {
    /// Interval between maintenance passes
    pub interval: Duration,
    /// Raw events older than this many days are trimmed
    pub raw_retention_days: i64,
}

impl Default for MaintenanceSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_MAINTENANCE_INTERVAL_SECS),
            raw_retention_days: DEFAULT_RAW_RETENTION_DAYS,
        }
    }
}

pub struct MaintenanceScheduler {
    db: DbManager,
    raw: Arc<dyn RawEventStore>,
    config: MaintenanceSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl MaintenanceScheduler {
    pub fn new(
        db: DbManager,
        raw: Arc<dyn RawEventStore>,
        config: MaintenanceSchedulerConfig,
    ) -> Self {
        Self {
            db,
            raw,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler. Idempotent: restarts any running task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            debug!("maintenance scheduler already running, restarting");
            self.stop().await?;
        }

        self.cancellation_token = CancellationToken::new();
        let db = self.db.clone();
        let raw = Arc::clone(&self.raw);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::maintenance_loop(db, raw, config, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!(
            interval_secs = self.config.interval.as_secs(),
            retention_days = self.config.raw_retention_days,
            "maintenance scheduler started"
        );
        Ok(())
    }

    /// Stop the scheduler. No-op when idle.
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

        info!("maintenance scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn maintenance_loop(
        db: DbManager,
        raw: Arc<dyn RawEventStore>,
        config: MaintenanceSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("maintenance loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    Self::run_pass(&db, &raw, &config).await;
                }
            }
        }
    }

    async fn run_pass(db: &DbManager, raw: &Arc<dyn RawEventStore>, config: &MaintenanceSchedulerConfig) {
        let health = {
            let db = db.clone();
            tokio::task::spawn_blocking(move || db.health_check()).await
        };
        match health {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "database health check failed, skipping maintenance pass");
                return;
            }
            Err(e) => {
                warn!(error = %e, "health check task failed, skipping maintenance pass");
                return;
            }
        }

        let cutoff = Utc::now().timestamp_millis() - config.raw_retention_days * DAY_MS;
        match raw.delete_before(cutoff).await {
            Ok(removed) => {
                let remaining = raw.count().await.unwrap_or(-1);
                info!(removed, remaining, "trimmed raw events past retention");
                if removed > 0 {
                    let db = db.clone();
                    let vacuum =
                        tokio::task::spawn_blocking(move || db.vacuum()).await;
                    if let Ok(Err(e)) = vacuum {
                        warn!(error = %e, "vacuum failed");
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to trim raw events"),
        }
    }
}

impl Drop for MaintenanceScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}
