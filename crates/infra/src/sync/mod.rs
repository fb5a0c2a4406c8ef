//! Bidirectional synchronization with the remote backend.

pub mod engine;
pub mod errors;

pub use engine::{SyncEngine, SyncEngineConfig};
pub use errors::SyncError;
