//! Sync engine error types.

use thiserror::Error;

use netlens_domain::NetLensError;

use crate::api::ApiError;

/// Errors surfaced by a `sync_all` invocation.
///
/// `SyncInProgress` and `NotAuthenticated` are fast-fail conditions checked
/// before any network traffic; everything else is carried per category
/// inside the report.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync already in progress")]
    SyncInProgress,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("storage error: {0}")]
    Storage(#[from] NetLensError),
}
