//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by the navigation guard and any user-aware caller to decide what the
//! current session may see. One `SessionStore` is built at startup and shared
//! by `Arc`; it is the only writer of `SessionState`.
//!
//! DESIGN
//! ======
//! State lives in a `tokio::sync::watch` channel. Every mutation is published
//! through `send_modify`, so subscribers see each change and readers never see
//! a half-applied update. `loading` follows an in-flight counter held by an
//! RAII guard, which resets it on success, failure, and dropped futures alike.
//!
//! ERROR HANDLING
//! ==============
//! `login` and `register` surface failures to the caller. `initialize`,
//! `refresh`, and `logout` absorb every failure into "not authenticated" so a
//! page load or background refresh never errors out.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, watch};

use crate::net::api::AuthApi;
use crate::net::error::TransportError;
use crate::net::types::{ApiError, ApiResponse, AuthPayload, LoginRequest, RegisterRequest, User};

/// Snapshot of the authentication state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    /// True while at least one store action is in flight.
    pub loading: bool,
    /// Set once the first `initialize` has resolved.
    pub initialized: bool,
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Failure surfaced by `login` and `register`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Network failure, non-2xx status, or undecodable body.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The envelope reported `success: false`.
    #[error(transparent)]
    Application(#[from] ApiError),
}

impl SessionError {
    /// True when the failure means "no valid session" rather than a broken server.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        match self {
            Self::Application(_) => true,
            Self::Transport(err) => err.is_unauthorized(),
        }
    }
}

pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    state: watch::Sender<SessionState>,
    in_flight: AtomicUsize,
    init_lock: Mutex<()>,
}

impl SessionStore {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { api, state, in_flight: AtomicUsize::new(0), init_lock: Mutex::new(()) }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Resolve the session once by fetching the current user.
    ///
    /// Later calls return immediately. Concurrent first calls share a single
    /// fetch: the rest wait for it and then return.
    pub async fn initialize(&self) {
        if self.is_initialized() {
            return;
        }
        let _init = self.init_lock.lock().await;
        if self.is_initialized() {
            return;
        }

        let _loading = self.begin_action();
        let user = self.fetch_current_user("initialize").await;
        self.state.send_modify(|state| {
            state.user = user;
            state.initialized = true;
        });
        tracing::debug!(authenticated = self.is_authenticated(), "session initialized");
    }

    /// Log in with email and password.
    ///
    /// On success the returned payload is the envelope's `data` and the user
    /// becomes current. On failure the current user is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Application`] carrying the envelope message, or
    /// [`SessionError::Transport`] when the request itself failed.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, SessionError> {
        let _loading = self.begin_action();
        let response = self.api.login(&LoginRequest { email, password }).await;
        self.accept_auth_response("login", response)
    }

    /// Register a new account; on success the new user becomes current.
    ///
    /// # Errors
    ///
    /// Same contract as [`SessionStore::login`].
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthPayload, SessionError> {
        let _loading = self.begin_action();
        let response = self.api.register(&RegisterRequest { email, password, name }).await;
        self.accept_auth_response("register", response)
    }

    /// Log out. The local session is cleared whatever the server answers.
    pub async fn logout(&self) {
        let _loading = self.begin_action();
        match self.api.logout().await {
            Ok(ApiResponse::Success(_)) => {}
            Ok(ApiResponse::Failure(error)) => {
                tracing::error!(code = %error.code, message = %error.message, "logout rejected; clearing session anyway");
            }
            Err(err) => {
                tracing::error!(error = %err, "logout request failed; clearing session anyway");
            }
        }
        self.state.send_modify(|state| state.user = None);
    }

    /// Re-fetch the current user; any failure leaves the session unauthenticated.
    pub async fn refresh(&self) {
        let _loading = self.begin_action();
        let user = self.fetch_current_user("refresh").await;
        self.state.send_modify(|state| state.user = user);
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    async fn fetch_current_user(&self, action: &'static str) -> Option<User> {
        let err = match self.api.me().await {
            Ok(ApiResponse::Success(payload)) => return Some(payload.user),
            Ok(ApiResponse::Failure(error)) => SessionError::Application(error),
            Err(err) => SessionError::Transport(err),
        };
        if err.is_unauthenticated() {
            tracing::debug!(action, reason = %err, "no active session");
        } else {
            tracing::warn!(action, error = %err, "current-user fetch failed; treating session as unauthenticated");
        }
        None
    }

    fn accept_auth_response(
        &self,
        action: &'static str,
        response: Result<ApiResponse<AuthPayload>, TransportError>,
    ) -> Result<AuthPayload, SessionError> {
        let outcome = response
            .map_err(SessionError::from)
            .and_then(|envelope| envelope.into_result().map_err(SessionError::from));
        match outcome {
            Ok(payload) => {
                let user = payload.user.clone();
                tracing::info!(action, user_id = %user.id, "authenticated");
                self.state.send_modify(|state| state.user = Some(user));
                Ok(payload)
            }
            Err(err) => {
                tracing::error!(action, error = %err, "authentication failed");
                Err(err)
            }
        }
    }

    fn begin_action(&self) -> LoadingGuard<'_> {
        self.state.send_modify(|state| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            state.loading = true;
        });
        LoadingGuard { store: self }
    }

    fn end_action(&self) {
        self.state.send_modify(|state| {
            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            state.loading = remaining > 0;
        });
    }
}

/// Keeps `loading` raised for the lifetime of one action.
struct LoadingGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.end_action();
    }
}
