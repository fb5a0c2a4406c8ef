//! Application context - dependency injection container.
//!
//! Wires the SQLite repositories, pipeline services, API client and
//! background schedulers together from a [`Config`]. Construction is
//! fail-fast: a broken database path or malformed base URL surfaces here,
//! not on the first scheduled tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use netlens_core::{
    AggregationService, CanonicalRecordStore, IngestService, KeyValueStore, RawEventStore,
    StatsStore, TransformService,
};
use netlens_domain::constants::DEFAULT_TRANSFORM_BATCH_SIZE;
use netlens_domain::{Config, NetLensError, Result};

use crate::api::{ApiClient, AuthService, HttpApi, HttpApiConfig};
use crate::database::{
    DbManager, SqliteKeyValueRepository, SqliteRawEventRepository, SqliteRecordRepository,
    SqliteStatsRepository,
};
use crate::scheduling::{
    MaintenanceScheduler, MaintenanceSchedulerConfig, RollupScheduler, SyncScheduler,
    SyncSchedulerConfig, TransformWorker, TransformWorkerConfig,
};
use crate::sync::{SyncEngine, SyncEngineConfig};

/// All background tasks, grouped so shutdown can stop them in one place.
struct Schedulers {
    transform_worker: TransformWorker,
    rollup: RollupScheduler,
    maintenance: MaintenanceScheduler,
    sync: Option<SyncScheduler>,
}

/// Application context - holds all services and dependencies.
pub struct AppContext {
    pub config: Config,
    pub db: DbManager,

    // Pipeline
    pub raw_events: Arc<dyn RawEventStore>,
    pub records: Arc<dyn CanonicalRecordStore>,
    pub stats: Arc<dyn StatsStore>,
    pub kv: Arc<dyn KeyValueStore>,
    pub ingest: Arc<IngestService>,
    pub transform: Arc<TransformService>,
    pub aggregator: Arc<AggregationService>,

    // Remote
    pub auth: Arc<AuthService>,
    pub api: Arc<ApiClient>,
    pub sync_engine: Arc<SyncEngine>,

    schedulers: Mutex<Schedulers>,
}

impl AppContext {
    /// Build and start the full application from a configuration.
    ///
    /// Opens the database, wires the pipeline and API layers, restores any
    /// persisted session, and starts the background tasks. The sync
    /// scheduler is only started when `config.sync.enabled` is set.
    pub async fn init(config: Config) -> Result<Self> {
        let db = DbManager::new(&config.database.path, config.database.pool_size)?;

        let raw_events: Arc<dyn RawEventStore> =
            Arc::new(SqliteRawEventRepository::new(db.pool()));
        let records: Arc<dyn CanonicalRecordStore> =
            Arc::new(SqliteRecordRepository::new(db.pool()));
        let stats: Arc<dyn StatsStore> = Arc::new(SqliteStatsRepository::new(db.pool()));
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueRepository::new(db.pool()));

        let aggregator = Arc::new(AggregationService::new(records.clone(), stats.clone()));
        let transform = Arc::new(TransformService::new(
            raw_events.clone(),
            records.clone(),
            aggregator.clone(),
            kv.clone(),
            DEFAULT_TRANSFORM_BATCH_SIZE,
        ));
        let ingest = Arc::new(IngestService::new(raw_events.clone()));

        let http = Arc::new(HttpApi::new(HttpApiConfig {
            base_url: config.api.base_url.clone(),
            api_key: config.api.api_key.clone(),
            timeout: Duration::from_secs(config.api.timeout_seconds),
        })?);
        let auth = Arc::new(AuthService::new(http.clone(), kv.clone()));

        // Pick up a session persisted by a previous run, if any.
        if let Err(e) = auth.restore().await {
            warn!(error = %e, "failed to restore persisted session");
        }

        let api = Arc::new(ApiClient::new(http, auth.clone()));
        let sync_engine = Arc::new(SyncEngine::new(
            api.clone(),
            auth.clone(),
            records.clone(),
            stats.clone(),
            kv.clone(),
            SyncEngineConfig { batch_size: config.sync.batch_size },
        ));

        let mut transform_worker = TransformWorker::new(
            transform.clone(),
            ingest.inserted_signal(),
            TransformWorkerConfig::default(),
        );
        transform_worker.start().await.map_err(NetLensError::from)?;

        let mut rollup = RollupScheduler::new(aggregator.clone());
        rollup.start().await.map_err(NetLensError::from)?;

        let mut maintenance = MaintenanceScheduler::new(
            db.clone(),
            raw_events.clone(),
            MaintenanceSchedulerConfig {
                interval: Duration::from_secs(config.maintenance.interval_seconds),
                raw_retention_days: config.maintenance.raw_retention_days,
            },
        );
        maintenance.start().await.map_err(NetLensError::from)?;

        let sync = if config.sync.enabled {
            let mut scheduler = SyncScheduler::new(
                sync_engine.clone(),
                auth.clone(),
                SyncSchedulerConfig {
                    interval: Duration::from_secs(config.sync.interval_seconds.max(1)),
                },
            );
            scheduler.start().await.map_err(NetLensError::from)?;
            Some(scheduler)
        } else {
            info!("scheduled sync disabled by configuration");
            None
        };

        info!("application context initialized");

        Ok(Self {
            config,
            db,
            raw_events,
            records,
            stats,
            kv,
            ingest,
            transform,
            aggregator,
            auth,
            api,
            sync_engine,
            schedulers: Mutex::new(Schedulers { transform_worker, rollup, maintenance, sync }),
        })
    }

    /// Stop all background tasks gracefully.
    ///
    /// Every scheduler also cancels its loop on Drop, so this is belt and
    /// braces for callers that want a bounded, joined shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        let mut schedulers = self.schedulers.lock().await;

        if let Some(sync) = schedulers.sync.as_mut() {
            sync.stop().await.map_err(NetLensError::from)?;
        }
        schedulers.transform_worker.stop().await.map_err(NetLensError::from)?;
        schedulers.rollup.stop().await.map_err(NetLensError::from)?;
        schedulers.maintenance.stop().await.map_err(NetLensError::from)?;

        info!("application context shut down");
        Ok(())
    }
}
