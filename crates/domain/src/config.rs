//! Application configuration structures
//!
//! Deserialized from environment variables or a JSON/TOML config file by the
//! infra config loader.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAINTENANCE_INTERVAL_SECS, DEFAULT_RAW_RETENTION_DAYS, DEFAULT_SYNC_BATCH_SIZE,
    DEFAULT_SYNC_INTERVAL_SECS, SYNC_REQUEST_TIMEOUT_SECS,
};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

/// Local SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path
    pub path: String,
    /// Connection pool size
    pub pool_size: u32,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for the remote API (e.g. "https://api.netlens.dev/v1")
    pub base_url: String,
    /// Optional API key sent as `X-API-Key` on every request
    #[serde(default)]
    pub api_key: Option<String>,
    /// Timeout for sync/auth requests in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between scheduled syncs in seconds
    pub interval_seconds: u64,
    /// Maximum number of records uploaded per category per sync
    #[serde(default = "default_sync_batch_size")]
    pub batch_size: usize,
    /// Whether scheduled sync is enabled
    pub enabled: bool,
}

/// Housekeeping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Interval between maintenance passes in seconds
    pub interval_seconds: u64,
    /// Raw events older than this many days are trimmed
    pub raw_retention_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_MAINTENANCE_INTERVAL_SECS,
            raw_retention_days: DEFAULT_RAW_RETENTION_DAYS,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_SYNC_INTERVAL_SECS,
            batch_size: DEFAULT_SYNC_BATCH_SIZE,
            enabled: true,
        }
    }
}

fn default_request_timeout() -> u64 {
    SYNC_REQUEST_TIMEOUT_SECS
}

fn default_sync_batch_size() -> usize {
    DEFAULT_SYNC_BATCH_SIZE
}
