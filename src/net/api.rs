//! REST client for the authentication API.
//!
//! Endpoints (relative to the configured base URL):
//! - `POST /auth/signup`   → [`AuthResponse`]
//! - `POST /auth/signin`   → [`AuthResponse`]
//! - `POST /auth/logout`   → [`MessageResponse`]
//! - `GET  /users/profile` → [`User`]
//! - `GET  /users`         → `Vec<User>` (public)
//!
//! ERROR HANDLING
//! ==============
//! Every request carries `Authorization: Bearer <token>` when a token is
//! persisted. A 401 from any endpoint publishes
//! [`ApiEvent::SessionExpired`] and returns [`ApiError::SessionExpired`];
//! the client itself never clears storage or navigates. Other failures
//! carry the server-provided message when there is one.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{AuthResponse, MessageResponse, ServerErrorBody, SigninData, SignupData, User};
use crate::config::ClientConfig;
use crate::events::{ApiEvent, EventBus};
use crate::storage::TokenStore;

pub const SIGNUP_PATH: &str = "/auth/signup";
pub const SIGNIN_PATH: &str = "/auth/signin";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const PROFILE_PATH: &str = "/users/profile";
pub const USERS_PATH: &str = "/users";

/// Fallback text when neither the server nor the transport gives a message.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server could not be reached or the request timed out.
    #[error("network error: {0}")]
    Network(String),

    /// The server rejected the credentials or the token (HTTP 401).
    #[error("session expired: {}", .message.as_deref().unwrap_or("unauthorized"))]
    SessionExpired { message: Option<String> },

    /// The server returned another non-success status.
    #[error("server error: status {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Server { status: u16, message: Option<String> },

    /// A success response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Message suitable for the form's general error slot.
    ///
    /// Server-provided text wins; network failures and responses without a
    /// message fall back to a generic string.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionExpired { message: Some(m) } | Self::Server { message: Some(m), .. } => m.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_owned(),
        }
    }

    /// HTTP status when the error came from a server response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Calls the session store makes against the remote API.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn signup(&self, data: &SignupData) -> Result<AuthResponse, ApiError>;
    async fn signin(&self, credentials: &SigninData) -> Result<AuthResponse, ApiError>;
    async fn logout(&self) -> Result<MessageResponse, ApiError>;
    async fn profile(&self) -> Result<User, ApiError>;
    async fn users(&self) -> Result<Vec<User>, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// `reqwest`-backed [`AuthApi`].
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    events: EventBus,
}

impl ApiClient {
    /// Build a client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>, events: EventBus) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_url.trim_end_matches('/').to_owned(), tokens, events })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bearer_token(&self) -> Option<String> {
        match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "token unreadable; sending request without auth");
                None
            }
        }
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.request(method.clone(), url);
        let token = self.bearer_token();
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "api request failed");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let message = error_message(response).await;
            tracing::info!(%method, path, "api rejected token; session expired");
            self.events.publish(ApiEvent::SessionExpired { endpoint: path.to_owned(), rejected_token: token });
            return Err(ApiError::SessionExpired { message });
        }
        if !status.is_success() {
            let message = error_message(response).await;
            tracing::warn!(%method, path, status = status.as_u16(), "api returned error status");
            return Err(ApiError::Server { status: status.as_u16(), message });
        }

        let text = response.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

async fn error_message(response: reqwest::Response) -> Option<String> {
    let text = response.text().await.ok()?;
    serde_json::from_str::<ServerErrorBody>(&text).ok()?.message
}

#[async_trait::async_trait]
impl AuthApi for ApiClient {
    async fn signup(&self, data: &SignupData) -> Result<AuthResponse, ApiError> {
        self.send(Method::POST, SIGNUP_PATH, Some(data)).await
    }

    async fn signin(&self, credentials: &SigninData) -> Result<AuthResponse, ApiError> {
        self.send(Method::POST, SIGNIN_PATH, Some(credentials)).await
    }

    async fn logout(&self) -> Result<MessageResponse, ApiError> {
        self.send::<(), _>(Method::POST, LOGOUT_PATH, None).await
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.send::<(), _>(Method::GET, PROFILE_PATH, None).await
    }

    async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.send::<(), _>(Method::GET, USERS_PATH, None).await
    }
}
