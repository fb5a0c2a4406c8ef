//! SQLite-backed storage.

pub mod kv_repository;
pub mod manager;
pub mod raw_event_repository;
pub mod record_repository;
pub mod stats_repository;

pub use kv_repository::SqliteKeyValueRepository;
pub use manager::{DbManager, DbPool, SCHEMA_VERSION};
pub use raw_event_repository::SqliteRawEventRepository;
pub use record_repository::SqliteRecordRepository;
pub use stats_repository::SqliteStatsRepository;
