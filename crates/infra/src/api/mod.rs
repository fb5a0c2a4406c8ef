//! Remote API integration: transport, session management and the
//! authenticated client.

pub mod auth;
pub mod client;
pub mod errors;
pub mod http;
pub mod types;

pub use auth::{AuthService, SessionProvider};
pub use client::ApiClient;
pub use errors::ApiError;
pub use http::{HttpApi, HttpApiConfig};
