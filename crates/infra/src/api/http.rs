//! Low-level HTTP transport for the remote API.
//!
//! Owns the reqwest client, the base URL and the optional `X-API-Key`
//! header. Auth headers and retry policy live one level up in
//! [`ApiClient`](super::client::ApiClient).

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::debug;

use super::errors::ApiError;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Base URL for the API (e.g., "https://api.netlens.dev/v1")
    pub base_url: String,
    /// Optional API key sent as `X-API-Key` on every request
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.netlens.dev/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Thin wrapper over a shared reqwest client.
pub struct HttpApi {
    client: reqwest::Client,
    config: HttpApiConfig,
}

impl HttpApi {
    /// Build the transport.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the underlying client cannot be built.
    pub fn new(config: HttpApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Start a request to `path`, with content type and API key attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let mut builder =
            self.client.request(method, url).header("Content-Type", "application/json");
        if let Some(key) = &self.config.api_key {
            builder = builder.header("X-API-Key", key);
        }
        builder
    }

    /// Send a request, mapping transport failures but not HTTP status codes.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.timeout)
            } else {
                ApiError::Network(format!("request failed: {}", e))
            }
        })
    }

    /// Send a request with a one-off timeout tighter than the client default.
    pub async fn send_with_timeout(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<Response, ApiError> {
        match tokio::time::timeout(timeout, self.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    }
}

/// Classify a non-success HTTP status.
pub(crate) fn map_status_error(status: StatusCode, url: &str, body: String) -> ApiError {
    let message = if body.is_empty() {
        format!("{} returned status {}", url, status)
    } else {
        format!("{} returned status {}: {}", url, status, body)
    };

    debug!(status = %status, url = %url, "non-success response");

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ApiError::Auth(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiError::RateLimit(message)
    } else if status.is_server_error() {
        ApiError::Server(message)
    } else if status.is_client_error() {
        ApiError::Client(message)
    } else {
        ApiError::Network(message)
    }
}

/// Read a JSON body, mapping parse failures to `ApiError::Client`.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ApiError> {
    response
        .json()
        .await
        .map_err(|e| ApiError::Client(format!("Failed to parse response: {}", e)))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn attaches_api_key_header_when_configured() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("X-API-Key", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let http = HttpApi::new(HttpApiConfig {
            base_url: mock_server.uri(),
            api_key: Some("secret".into()),
            ..Default::default()
        })
        .unwrap();

        let response = http.send(http.request(Method::GET, "/ping")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn status_mapping_matches_error_taxonomy() {
        let url = "https://api.example.com/x";
        assert!(matches!(
            map_status_error(StatusCode::UNAUTHORIZED, url, String::new()),
            ApiError::Auth(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::FORBIDDEN, url, String::new()),
            ApiError::Auth(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::TOO_MANY_REQUESTS, url, String::new()),
            ApiError::RateLimit(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_GATEWAY, url, String::new()),
            ApiError::Server(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::NOT_FOUND, url, String::new()),
            ApiError::Client(_)
        ));
    }
}
