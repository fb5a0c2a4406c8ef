//! Authenticated API client.
//!
//! Wraps the HTTP transport with bearer auth and the 401 policy: exactly one
//! token refresh followed by exactly one retry; a second 401 is terminal for
//! that call.

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::auth::SessionProvider;
use super::errors::ApiError;
use super::http::{map_status_error, read_json, HttpApi};
use super::types::{
    DownloadResponse, ShareRequest, ShareResponse, TeamMember, UploadRequest, UploadResponse,
};

pub struct ApiClient {
    http: Arc<HttpApi>,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    pub fn new(http: Arc<HttpApi>, session: Arc<dyn SessionProvider>) -> Self {
        Self { http, session }
    }

    /// Upload one category batch.
    #[instrument(skip(self, request), fields(data_type = %request.data_type))]
    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, ApiError> {
        let response =
            self.send_authed(Method::POST, "/sync/upload", Some(request), &[]).await?;
        let body: UploadResponse = read_json(response).await?;
        info!(sync_id = %body.sync_id, "upload accepted");
        Ok(body)
    }

    /// Download one category batch.
    #[instrument(skip(self), fields(data_type = %data_type))]
    pub async fn download(
        &self,
        data_type: &str,
        team_id: &str,
        since: i64,
        limit: usize,
    ) -> Result<DownloadResponse, ApiError> {
        let query = [
            ("dataType".to_string(), data_type.to_string()),
            ("teamId".to_string(), team_id.to_string()),
            ("since".to_string(), since.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let response =
            self.send_authed::<()>(Method::GET, "/sync/download", None, &query).await?;
        read_json(response).await
    }

    /// List the members of a team.
    pub async fn team_members(&self, team_id: &str) -> Result<Vec<TeamMember>, ApiError> {
        let path = format!("/teams/{team_id}/members");
        let response = self.send_authed::<()>(Method::GET, &path, None, &[]).await?;
        read_json(response).await
    }

    /// Share items with the team.
    pub async fn share(
        &self,
        team_id: &str,
        request: &ShareRequest,
    ) -> Result<ShareResponse, ApiError> {
        let path = format!("/teams/{team_id}/share");
        let response = self.send_authed(Method::POST, &path, Some(request), &[]).await?;
        read_json(response).await
    }

    /// Send an authenticated request with the refresh-once-retry-once policy.
    async fn send_authed<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(String, String)],
    ) -> Result<Response, ApiError> {
        let response = self.send_once(method.clone(), path, body, query).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_status(response, path).await;
        }

        debug!(path, "401 response, refreshing session and retrying once");
        self.session.refresh().await?;

        let retried = self.send_once(method, path, body, query).await?;
        Self::check_status(retried, path).await
    }

    async fn send_once<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(String, String)],
    ) -> Result<Response, ApiError> {
        let token = self.session.access_token().await?;
        let mut request = self.http.request(method, path).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        self.http.send(request).await
    }

    async fn check_status(response: Response, path: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(map_status_error(status, path, body))
        }
    }
}
