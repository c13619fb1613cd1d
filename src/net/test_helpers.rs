//! Scripted `AuthApi` for store and guard tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::api::AuthApi;
use super::error::TransportError;
use super::types::{ApiError, ApiResponse, AuthPayload, LoginRequest, RegisterRequest, User};

pub type AuthResult = Result<ApiResponse<AuthPayload>, TransportError>;
pub type LogoutResult = Result<ApiResponse<serde_json::Value>, TransportError>;

/// Replays queued responses per endpoint and counts calls.
///
/// An endpoint with an empty queue answers with a 401 transport error
/// (logout answers success).
#[derive(Default)]
pub struct ScriptedApi {
    pub login_responses: Mutex<VecDeque<AuthResult>>,
    pub register_responses: Mutex<VecDeque<AuthResult>>,
    pub logout_responses: Mutex<VecDeque<LogoutResult>>,
    pub me_responses: Mutex<VecDeque<AuthResult>>,
    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub last_login_email: Mutex<Option<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_me(self, response: AuthResult) -> Self {
        self.me_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_login(self, response: AuthResult) -> Self {
        self.login_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_register(self, response: AuthResult) -> Self {
        self.register_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_logout(self, response: LogoutResult) -> Self {
        self.logout_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn me_count(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }
}

fn next_or(queue: &Mutex<VecDeque<AuthResult>>) -> AuthResult {
    queue.lock().unwrap().pop_front().unwrap_or_else(|| Err(unauthorized()))
}

#[async_trait::async_trait]
impl AuthApi for ScriptedApi {
    async fn login(&self, request: &LoginRequest<'_>) -> AuthResult {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_login_email.lock().unwrap() = Some(request.email.to_owned());
        next_or(&self.login_responses)
    }

    async fn register(&self, _request: &RegisterRequest<'_>) -> AuthResult {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        next_or(&self.register_responses)
    }

    async fn logout(&self) -> LogoutResult {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::Success(serde_json::Value::Null)))
    }

    async fn me(&self) -> AuthResult {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent callers can interleave.
        tokio::task::yield_now().await;
        next_or(&self.me_responses)
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn user(id: &str) -> User {
    User {
        id: id.to_owned(),
        email: format!("user{id}@example.com"),
        name: format!("User {id}"),
        created_at: "2025-01-01T00:00:00Z".to_owned(),
        updated_at: "2025-01-01T00:00:00Z".to_owned(),
    }
}

pub fn success(id: &str) -> AuthResult {
    Ok(ApiResponse::Success(AuthPayload { user: user(id) }))
}

pub fn envelope_failure(message: &str, code: &str) -> AuthResult {
    Ok(ApiResponse::Failure(ApiError::new(message, code)))
}

pub fn unauthorized() -> TransportError {
    TransportError::Status {
        status: 401,
        status_text: "Unauthorized".to_owned(),
        body: String::new(),
        envelope: Some(ApiError::new("Not authenticated", "NOT_AUTHENTICATED")),
    }
}

pub fn server_error() -> TransportError {
    TransportError::Status {
        status: 500,
        status_text: "Internal Server Error".to_owned(),
        body: "boom".to_owned(),
        envelope: None,
    }
}

pub fn network_error() -> TransportError {
    TransportError::Network {
        method: "GET".to_owned(),
        url: "http://127.0.0.1:8080/api/auth/me".to_owned(),
        message: "connection refused".to_owned(),
    }
}
