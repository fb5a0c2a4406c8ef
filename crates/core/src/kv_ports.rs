//! Port interface for persisted key/value state
//!
//! Backs the sync cursor, the transform cursor and the persisted auth
//! session, independent of the tabular telemetry store.

use async_trait::async_trait;
use netlens_domain::Result;

/// Simple durable key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key, `None` when the key was never set.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value, overwriting any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All key/value pairs whose key starts with `prefix`, ordered by key.
    /// Backs the configuration sync category.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;
}
