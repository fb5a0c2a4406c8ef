//! Periodic sync scheduler.
//!
//! Triggers a sync pass on a fixed interval when a session is active and no
//! pass is already running. Failures are logged and swallowed; retry is the
//! next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use netlens_domain::constants::DEFAULT_SYNC_INTERVAL_SECS;

use crate::api::AuthService;
use crate::scheduling::error::{SchedulerError, SchedulerResult};
use crate::sync::{SyncEngine, SyncError};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the sync scheduler
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Interval between sync passes
    pub interval: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS) }
    }
}

pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    auth: Arc<AuthService>,
    config: SyncSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SyncScheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        auth: Arc<AuthService>,
        config: SyncSchedulerConfig,
    ) -> Self {
        Self {
            engine,
            auth,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler.
    ///
    /// Idempotent: an already-running task is stopped first, so repeated
    /// calls never leave two loops alive.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            debug!("sync scheduler already running, restarting");
            self.stop().await?;
        }

        self.cancellation_token = CancellationToken::new();
        let engine = Arc::clone(&self.engine);
        let auth = Arc::clone(&self.auth);
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sync_loop(engine, auth, interval, cancel).await;
        });
        *self.task_handle.lock().await = Some(handle);

        info!(interval_secs = self.config.interval.as_secs(), "sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully. No-op when idle.
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

        info!("sync scheduler stopped");
        Ok(())
    }

    /// Whether the background task is alive.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn sync_loop(
        engine: Arc<SyncEngine>,
        auth: Arc<AuthService>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut session_expired = auth.session_expired();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("sync loop cancelled");
                    break;
                }
                changed = session_expired.changed() => {
                    if changed.is_err() {
                        debug!("session channel closed, stopping sync loop");
                        break;
                    }
                    if *session_expired.borrow() {
                        warn!("session expired, scheduled sync paused until next login");
                    } else {
                        debug!("session active, scheduled sync resumed");
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    if engine.is_syncing() {
                        debug!("previous sync still running, skipping tick");
                        continue;
                    }
                    if !auth.is_authenticated().await {
                        debug!("no active session, skipping scheduled sync");
                        continue;
                    }
                    match engine.sync_all().await {
                        Ok(report) if report.is_clean() => {
                            debug!(
                                uploaded = report.uploaded,
                                downloaded = report.downloaded,
                                "scheduled sync complete"
                            );
                        }
                        Ok(report) => {
                            warn!(errors = report.errors.len(), "scheduled sync had category errors");
                        }
                        Err(SyncError::SyncInProgress) => {
                            debug!("sync raced with a manual trigger, skipping");
                        }
                        Err(e) => {
                            warn!(error = %e, "scheduled sync failed");
                        }
                    }
                }
            }
        }
    }
}

/// Ensure the loop is cancelled when the scheduler is dropped
impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}
