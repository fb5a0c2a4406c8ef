//! # NetLens Infra
//!
//! Infrastructure layer for NetLens: SQLite repositories, the remote API
//! client and auth session, the sync engine, and the background schedulers.
//!
//! Everything here implements the port traits defined in `netlens-core`
//! against concrete backends (rusqlite, reqwest, tokio).

pub mod api;
pub mod config;
pub mod context;
pub mod database;
pub mod errors;
pub mod scheduling;
pub mod sync;
pub mod telemetry;

pub use api::{ApiClient, ApiError, AuthService, HttpApi};
pub use context::AppContext;
pub use database::{
    DbManager, SqliteKeyValueRepository, SqliteRawEventRepository, SqliteRecordRepository,
    SqliteStatsRepository,
};
pub use errors::InfraError;
pub use scheduling::{
    MaintenanceScheduler, MaintenanceSchedulerConfig, RollupScheduler, SyncScheduler,
    SyncSchedulerConfig, TransformWorker, TransformWorkerConfig,
};
pub use sync::{SyncEngine, SyncEngineConfig, SyncError};
