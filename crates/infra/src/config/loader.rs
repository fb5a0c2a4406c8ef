//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `NETLENS_DB_PATH`: Database file path
//! - `NETLENS_DB_POOL_SIZE`: Connection pool size
//! - `NETLENS_API_BASE_URL`: Remote API base URL
//! - `NETLENS_API_KEY`: Optional API key sent on every request
//! - `NETLENS_API_TIMEOUT`: Request timeout in seconds
//! - `NETLENS_SYNC_INTERVAL`: Sync interval in seconds
//! - `NETLENS_SYNC_BATCH_SIZE`: Upload batch size per category
//! - `NETLENS_SYNC_ENABLED`: Whether scheduled sync is enabled (true/false)
//! - `NETLENS_MAINTENANCE_INTERVAL`: Maintenance interval in seconds
//! - `NETLENS_RAW_RETENTION_DAYS`: Raw event retention in days
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./netlens.json` or `./netlens.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use netlens_domain::{
    ApiConfig, Config, DatabaseConfig, MaintenanceConfig, NetLensError, Result, SyncConfig,
};
use netlens_domain::constants::{
    DEFAULT_MAINTENANCE_INTERVAL_SECS, DEFAULT_RAW_RETENTION_DAYS, DEFAULT_SYNC_BATCH_SIZE,
    SYNC_REQUEST_TIMEOUT_SECS,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `NetLensError::Config` if configuration cannot be loaded from
/// either source.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `NETLENS_DB_PATH`, `NETLENS_API_BASE_URL` and `NETLENS_SYNC_INTERVAL`
/// must be present; everything else falls back to defaults.
///
/// # Errors
/// Returns `NetLensError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("NETLENS_DB_PATH")?;
    let db_pool_size = env_u64("NETLENS_DB_POOL_SIZE", 4)? as u32;

    let api_base_url = env_var("NETLENS_API_BASE_URL")?;
    let api_key = std::env::var("NETLENS_API_KEY").ok();
    let api_timeout = env_u64("NETLENS_API_TIMEOUT", SYNC_REQUEST_TIMEOUT_SECS)?;

    let sync_interval = env_var("NETLENS_SYNC_INTERVAL").and_then(|s| {
        s.parse::<u64>()
            .map_err(|e| NetLensError::Config(format!("Invalid sync interval: {}", e)))
    })?;
    let sync_batch_size = env_u64("NETLENS_SYNC_BATCH_SIZE", DEFAULT_SYNC_BATCH_SIZE as u64)?;
    let sync_enabled = env_bool("NETLENS_SYNC_ENABLED", true);

    let maintenance_interval =
        env_u64("NETLENS_MAINTENANCE_INTERVAL", DEFAULT_MAINTENANCE_INTERVAL_SECS)?;
    let raw_retention_days =
        env_u64("NETLENS_RAW_RETENTION_DAYS", DEFAULT_RAW_RETENTION_DAYS as u64)? as i64;

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        api: ApiConfig { base_url: api_base_url, api_key, timeout_seconds: api_timeout },
        sync: SyncConfig {
            interval_seconds: sync_interval,
            batch_size: sync_batch_size as usize,
            enabled: sync_enabled,
        },
        maintenance: MaintenanceConfig {
            interval_seconds: maintenance_interval,
            raw_retention_days,
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `NetLensError::Config` if no file is found or parsing fails.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(NetLensError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            NetLensError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| NetLensError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| NetLensError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| NetLensError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(NetLensError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("netlens.json"),
            cwd.join("netlens.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("netlens.json"),
                exe_dir.join("netlens.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        NetLensError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse optional numeric environment variable, defaulting when unset.
fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(s) => s
            .parse::<u64>()
            .map_err(|e| NetLensError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
