//! Infrastructure error conversions
//!
//! Newtype bridge that converts backend-specific errors (rusqlite, r2d2,
//! serde_json) into the domain error without the domain crate having to
//! know those libraries exist.

use netlens_domain::NetLensError;

/// Wrapper carrying a domain error produced by an infrastructure failure.
#[derive(Debug)]
pub struct InfraError(pub NetLensError);

impl From<InfraError> for NetLensError {
    fn from(err: InfraError) -> Self {
        err.0
    }
}

impl From<rusqlite::Error> for InfraError {
    fn from(err: rusqlite::Error) -> Self {
        InfraError(NetLensError::Database(err.to_string()))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(err: r2d2::Error) -> Self {
        InfraError(NetLensError::Database(format!("connection pool error: {err}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(err: serde_json::Error) -> Self {
        InfraError(NetLensError::InvalidInput(format!("json error: {err}")))
    }
}

/// Map a rusqlite error straight into the domain error.
pub fn map_sql_error(err: rusqlite::Error) -> NetLensError {
    InfraError::from(err).into()
}

/// Map a blocking-task join error into the domain error.
pub fn map_join_error(err: tokio::task::JoinError) -> NetLensError {
    if err.is_cancelled() {
        NetLensError::Internal("blocking database task cancelled".into())
    } else {
        NetLensError::Internal(format!("blocking database task failed: {err}"))
    }
}
