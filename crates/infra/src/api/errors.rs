//! API-specific error types
//!
//! Provides error classification for API operations.

use std::time::Duration;

use thiserror::Error;

use netlens_domain::NetLensError;

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// Whether a later attempt could plausibly succeed. Auth errors are
    /// retryable only through the refresh path, not by replaying the call.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit(_) | Self::Server(_) | Self::Network(_) | Self::Timeout(_))
    }
}

impl From<ApiError> for NetLensError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(msg) => NetLensError::Auth(msg),
            ApiError::InvalidCredentials => NetLensError::Auth("invalid credentials".into()),
            ApiError::Config(msg) => NetLensError::Config(msg),
            ApiError::Timeout(d) => NetLensError::Network(format!("timeout after {d:?}")),
            ApiError::RateLimit(msg)
            | ApiError::Server(msg)
            | ApiError::Client(msg)
            | ApiError::Network(msg) => NetLensError::Network(msg),
        }
    }
}
