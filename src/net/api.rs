//! REST adapter for the auth endpoints.
//!
//! ARCHITECTURE
//! ============
//! `AuthApi` is the seam the session store talks to. `HttpAuthApi` is the
//! production implementation: a `reqwest` client with a cookie store (the
//! session cookie rides along on every call), a fixed base URL, and one
//! uniform retry policy.
//!
//! ERROR HANDLING
//! ==============
//! A 2xx response always yields `Ok(ApiResponse)`, even when the envelope
//! reports failure. Anything below the envelope (network error, non-2xx
//! status, undecodable body) yields `Err(TransportError)`. Failed responses
//! are logged before the error propagates.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::TransportError;
use super::types::{ApiResponse, AuthPayload, LoginRequest, RegisterRequest};
use crate::config::ApiConfig;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";

/// Calls the session store makes against the auth API.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network failure or a non-2xx status.
    async fn login(&self, request: &LoginRequest<'_>) -> Result<ApiResponse<AuthPayload>, TransportError>;

    /// `POST /auth/register`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network failure or a non-2xx status.
    async fn register(&self, request: &RegisterRequest<'_>) -> Result<ApiResponse<AuthPayload>, TransportError>;

    /// `POST /auth/logout`. The success payload carries nothing the client uses.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network failure or a non-2xx status.
    async fn logout(&self) -> Result<ApiResponse<serde_json::Value>, TransportError>;

    /// `GET /auth/me`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network failure or a non-2xx status.
    async fn me(&self) -> Result<ApiResponse<AuthPayload>, TransportError>;
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
    retry: u32,
}

impl HttpAuthApi {
    /// Build the adapter. Cookies set by the API are stored and replayed.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned(), retry: config.retry })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<ApiResponse<T>, TransportError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = endpoint_url(&self.base_url, path);
        let mut attempt = 0;
        loop {
            match self.send_once(&method, &url, body).await {
                Ok(text) => return parse_envelope(&text),
                Err(err) if attempt < self.retry && err.is_transient() => {
                    attempt += 1;
                    tracing::debug!(%method, %url, attempt, error = %err, "retrying API request");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once<B>(&self, method: &Method, url: &str, body: Option<&B>) -> Result<String, TransportError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let network_error = |e: reqwest::Error| TransportError::Network {
            method: method.to_string(),
            url: url.to_owned(),
            message: e.to_string(),
        };

        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        let text = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or_default().to_owned();
            tracing::error!(status = status.as_u16(), status_text = %status_text, body = %text, "API error");
            return Err(TransportError::Status {
                status: status.as_u16(),
                status_text,
                envelope: failure_envelope(&text),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest<'_>) -> Result<ApiResponse<AuthPayload>, TransportError> {
        self.request(Method::POST, LOGIN_PATH, Some(request)).await
    }

    async fn register(&self, request: &RegisterRequest<'_>) -> Result<ApiResponse<AuthPayload>, TransportError> {
        self.request(Method::POST, REGISTER_PATH, Some(request)).await
    }

    async fn logout(&self) -> Result<ApiResponse<serde_json::Value>, TransportError> {
        self.request::<(), _>(Method::POST, LOGOUT_PATH, None).await
    }

    async fn me(&self) -> Result<ApiResponse<AuthPayload>, TransportError> {
        self.request::<(), _>(Method::GET, ME_PATH, None).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn parse_envelope<T: DeserializeOwned>(text: &str) -> Result<ApiResponse<T>, TransportError> {
    serde_json::from_str(text).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Pull the application error out of a non-2xx body, when it is an envelope.
fn failure_envelope(text: &str) -> Option<super::types::ApiError> {
    match serde_json::from_str::<ApiResponse<serde_json::Value>>(text) {
        Ok(ApiResponse::Failure(error)) => Some(error),
        _ => None,
    }
}
