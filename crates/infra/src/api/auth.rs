//! Session management against the remote API.
//!
//! Holds the in-memory token pair, persists it through the key/value store
//! so sessions survive restarts, and exposes a session-expired signal the
//! schedulers watch to stop scheduling authenticated work.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use netlens_core::KeyValueStore;
use netlens_domain::constants::{
    HEALTH_CHECK_TIMEOUT_SECS, KV_AUTH_TOKEN, KV_REFRESH_TOKEN, KV_TEAM_ID, KV_USER_ID,
};
use netlens_domain::SessionTokens;

use super::errors::ApiError;
use super::http::{map_status_error, read_json, HttpApi};
use super::types::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};

/// Trait for supplying bearer tokens to the API client.
///
/// Allows dependency injection and testing with mock providers.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current access token; errors when no session is active.
    async fn access_token(&self) -> Result<String, ApiError>;

    /// Attempt exactly one token refresh.
    async fn refresh(&self) -> Result<(), ApiError>;
}

/// Authentication service with persisted sessions.
pub struct AuthService {
    http: Arc<HttpApi>,
    kv: Arc<dyn KeyValueStore>,
    session: RwLock<Option<SessionTokens>>,
    refresh_lock: Mutex<()>,
    expired_tx: watch::Sender<bool>,
}

impl AuthService {
    pub fn new(http: Arc<HttpApi>, kv: Arc<dyn KeyValueStore>) -> Self {
        let (expired_tx, _) = watch::channel(false);
        Self { http, kv, session: RwLock::new(None), refresh_lock: Mutex::new(()), expired_tx }
    }

    /// Load a persisted session on startup.
    ///
    /// Returns `true` when a complete token set was found.
    pub async fn restore(&self) -> netlens_domain::Result<bool> {
        let token = self.kv.get(KV_AUTH_TOKEN).await?;
        let refresh_token = self.kv.get(KV_REFRESH_TOKEN).await?;
        let user_id = self.kv.get(KV_USER_ID).await?;
        let team_id = self.kv.get(KV_TEAM_ID).await?;

        match (token, refresh_token, user_id, team_id) {
            (Some(access_token), Some(refresh_token), Some(user_id), Some(team_id)) => {
                *self.session.write().await =
                    Some(SessionTokens { access_token, refresh_token, user_id, team_id });
                info!("restored persisted session");
                Ok(true)
            }
            _ => {
                debug!("no persisted session found");
                Ok(false)
            }
        }
    }

    /// Authenticate with email and password.
    ///
    /// Session state is untouched on failure.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let request = self.http.request(Method::POST, "/auth/login").json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        });
        let response = self.http.send(request).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, "/auth/login", body));
        }

        let body: LoginResponse = read_json(response).await?;
        let tokens = SessionTokens {
            access_token: body.token,
            refresh_token: body.refresh_token,
            user_id: body.user.id,
            team_id: body.user.team_id,
        };
        self.store(tokens).await?;
        let _ = self.expired_tx.send(false);
        info!("login successful");
        Ok(())
    }

    /// Best-effort remote logout followed by an unconditional local clear.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(token) = self.current_token().await {
            let request =
                self.http.request(Method::POST, "/auth/logout").bearer_auth(token);
            match self.http.send(request).await {
                Ok(response) if response.status().is_success() => debug!("remote logout ok"),
                Ok(response) => warn!(status = %response.status(), "remote logout rejected"),
                Err(e) => warn!(error = %e, "remote logout failed"),
            }
        }
        self.clear().await;
        info!("session cleared");
    }

    /// Check token validity against the server with a short timeout.
    pub async fn verify(&self) -> Result<bool, ApiError> {
        let token = self
            .current_token()
            .await
            .ok_or_else(|| ApiError::Auth("no active session".into()))?;
        let request = self.http.request(Method::GET, "/auth/verify").bearer_auth(token);
        let response = self
            .http
            .send_with_timeout(request, std::time::Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .await?;
        Ok(response.status().is_success())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn team_id(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.team_id.clone())
    }

    /// Observer for session expiry; flips to `true` when a refresh fails and
    /// the session is cleared.
    pub fn session_expired(&self) -> watch::Receiver<bool> {
        self.expired_tx.subscribe()
    }

    async fn current_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.access_token.clone())
    }

    async fn store(&self, tokens: SessionTokens) -> Result<(), ApiError> {
        self.kv
            .set(KV_AUTH_TOKEN, &tokens.access_token)
            .await
            .map_err(|e| ApiError::Config(format!("failed to persist session: {e}")))?;
        self.kv
            .set(KV_REFRESH_TOKEN, &tokens.refresh_token)
            .await
            .map_err(|e| ApiError::Config(format!("failed to persist session: {e}")))?;
        self.kv
            .set(KV_USER_ID, &tokens.user_id)
            .await
            .map_err(|e| ApiError::Config(format!("failed to persist session: {e}")))?;
        self.kv
            .set(KV_TEAM_ID, &tokens.team_id)
            .await
            .map_err(|e| ApiError::Config(format!("failed to persist session: {e}")))?;
        *self.session.write().await = Some(tokens);
        Ok(())
    }

    async fn clear(&self) {
        *self.session.write().await = None;
        for key in [KV_AUTH_TOKEN, KV_REFRESH_TOKEN, KV_USER_ID, KV_TEAM_ID] {
            if let Err(e) = self.kv.delete(key).await {
                warn!(key, error = %e, "failed to delete persisted session key");
            }
        }
    }
}

#[async_trait]
impl SessionProvider for AuthService {
    async fn access_token(&self) -> Result<String, ApiError> {
        self.current_token().await.ok_or_else(|| ApiError::Auth("no active session".into()))
    }

    /// One refresh attempt. Failure clears the whole session (memory and
    /// persisted keys) and flips the session-expired signal.
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<(), ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let (refresh_token, user_id, team_id) = match self.session.read().await.as_ref() {
            Some(s) => (s.refresh_token.clone(), s.user_id.clone(), s.team_id.clone()),
            None => return Err(ApiError::Auth("no active session".into())),
        };

        let request = self
            .http
            .request(Method::POST, "/auth/refresh")
            .json(&RefreshRequest { refresh_token });

        let result = async {
            let response = self.http.send(request).await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(map_status_error(status, "/auth/refresh", body));
            }
            read_json::<RefreshResponse>(response).await
        }
        .await;

        match result {
            Ok(body) => {
                self.store(SessionTokens {
                    access_token: body.token,
                    refresh_token: body.refresh_token,
                    user_id,
                    team_id,
                })
                .await?;
                debug!("token refresh successful");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                self.clear().await;
                let _ = self.expired_tx.send(true);
                Err(e)
            }
        }
    }
}
