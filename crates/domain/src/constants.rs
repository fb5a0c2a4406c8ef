//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Sync engine configuration
pub const DEFAULT_SYNC_BATCH_SIZE: usize = 1000;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
pub const SYNC_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

// Transform layer configuration
pub const DEFAULT_TRANSFORM_BATCH_SIZE: usize = 500;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_PAGE_URL_LENGTH: usize = 2048;
pub const MAX_RESOURCE_TYPE_LENGTH: usize = 64;

// Maintenance configuration
pub const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_RAW_RETENTION_DAYS: i64 = 30;

// Persisted key/value state keys (independent of the tabular store)
pub const KV_AUTH_TOKEN: &str = "auth_token";
pub const KV_REFRESH_TOKEN: &str = "refresh_token";
pub const KV_USER_ID: &str = "user_id";
pub const KV_TEAM_ID: &str = "team_id";
pub const KV_LAST_SYNC_TIMESTAMP: &str = "last_sync_timestamp";
pub const KV_TRANSFORM_CURSOR: &str = "transform_cursor";

/// Key prefix under which synced configuration entries live
pub const KV_CONFIG_PREFIX: &str = "config.";
