//! End-to-end flows against an in-process auth API.
//!
//! The mock server speaks the real envelope, sets a `session_id` cookie on
//! login/register, and only answers `/auth/me` when that cookie comes back.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router as AxumRouter;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing_subscriber::fmt::MakeWriter;

use sessiongate::config::ApiConfig;
use sessiongate::net::api::{AuthApi, HttpAuthApi};
use sessiongate::net::error::TransportError;
use sessiongate::net::types::{ApiError, ApiResponse, AuthPayload, User};
use sessiongate::router::Router;
use sessiongate::router::routes::RouteTable;
use sessiongate::state::session::{SessionError, SessionStore};

const SESSION_COOKIE: &str = "session_id=s3cr3t";

// =============================================================================
// MOCK API
// =============================================================================

#[derive(Clone, Default)]
struct MockApi {
    me_calls: Arc<AtomicUsize>,
    /// Number of upcoming `/auth/me` calls to fail with 503.
    me_unavailable: Arc<AtomicUsize>,
    logout_calls: Arc<AtomicUsize>,
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
    #[serde(default)]
    name: Option<String>,
}

fn alice() -> User {
    User {
        id: "1".to_owned(),
        email: "a@b.com".to_owned(),
        name: "Alice".to_owned(),
        created_at: "2025-01-01T00:00:00Z".to_owned(),
        updated_at: "2025-01-01T00:00:00Z".to_owned(),
    }
}

fn failure(status: StatusCode, message: &str, code: &str) -> Response {
    let body: ApiResponse<()> = ApiResponse::Failure(ApiError::new(message, code));
    (status, Json(body)).into_response()
}

fn authenticated(user: User) -> Response {
    let cookie = format!("{SESSION_COOKIE}; Path=/; HttpOnly; SameSite=Lax");
    ([(header::SET_COOKIE, cookie)], Json(ApiResponse::Success(AuthPayload { user }))).into_response()
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.split(';').any(|pair| pair.trim() == SESSION_COOKIE))
}

async fn login(Json(body): Json<Credentials>) -> Response {
    if body.email == "a@b.com" && body.password == "pw" {
        authenticated(alice())
    } else {
        failure(StatusCode::UNAUTHORIZED, "Invalid email or password", "AUTH_INVALID_CREDENTIALS")
    }
}

async fn register(Json(body): Json<Credentials>) -> Response {
    if body.email == "a@b.com" {
        // Application-level rejection delivered with a 200 status.
        let envelope: ApiResponse<AuthPayload> =
            ApiResponse::Failure(ApiError::new("email already registered", "REGISTRATION_ERROR"));
        return Json(envelope).into_response();
    }
    authenticated(User {
        id: "2".to_owned(),
        email: body.email,
        name: body.name.unwrap_or_default(),
        ..alice()
    })
}

async fn logout(State(state): State<MockApi>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    let cookie = "session_id=; Path=/; HttpOnly; Max-Age=0";
    let body = ApiResponse::Success(serde_json::json!({ "message": "Logged out successfully" }));
    ([(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

async fn me(State(state): State<MockApi>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    let unavailable = state
        .me_unavailable
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if unavailable {
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }
    if has_session(&headers) {
        Json(ApiResponse::Success(AuthPayload { user: alice() })).into_response()
    } else {
        failure(StatusCode::UNAUTHORIZED, "Not authenticated", "NOT_AUTHENTICATED")
    }
}

async fn spawn_api(state: MockApi) -> String {
    let auth = AxumRouter::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .with_state(state);
    let app = AxumRouter::new().nest("/api", auth);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn session_for(state: MockApi) -> Arc<SessionStore> {
    let base_url = spawn_api(state).await;
    let api = HttpAuthApi::new(&ApiConfig::for_base_url(base_url)).unwrap();
    Arc::new(SessionStore::new(Arc::new(api)))
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// =============================================================================
// HTTP ADAPTER
// =============================================================================

#[tokio::test]
async fn failed_response_is_logged_with_status_and_body() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let state = MockApi::default();
    state.me_unavailable.store(1, Ordering::SeqCst);
    let base_url = spawn_api(state).await;
    let mut config = ApiConfig::for_base_url(base_url);
    config.retry = 0;
    let api = HttpAuthApi::new(&config).unwrap();

    assert_eq!(api.me().await.unwrap_err().status(), Some(503));

    let output = logs.contents();
    assert!(output.contains("ERROR"), "{output}");
    assert!(output.contains("API error"), "{output}");
    assert!(output.contains("status=503"), "{output}");
    assert!(output.contains("status_text=Service Unavailable"), "{output}");
    assert!(output.contains("body=try again"), "{output}");
}

#[tokio::test]
async fn me_without_cookie_is_a_transport_error_with_envelope() {
    let base_url = spawn_api(MockApi::default()).await;
    let api = HttpAuthApi::new(&ApiConfig::for_base_url(base_url)).unwrap();

    let err = api.me().await.unwrap_err();
    let TransportError::Status { status, ref envelope, ref body, .. } = err else {
        panic!("expected status error, got {err:?}");
    };
    assert_eq!(status, 401);
    assert_eq!(envelope.as_ref().map(|e| e.code.as_str()), Some("NOT_AUTHENTICATED"));
    assert!(body.contains("Not authenticated"));
    assert_eq!(err.to_string(), "Not authenticated");
}

#[tokio::test]
async fn transient_status_is_retried_once() {
    let state = MockApi::default();
    state.me_unavailable.store(1, Ordering::SeqCst);
    let base_url = spawn_api(state.clone()).await;
    let api = HttpAuthApi::new(&ApiConfig::for_base_url(base_url)).unwrap();

    // 503 then 401: the retry happened, and its answer is what surfaces.
    let err = api.me().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(state.me_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retry_gives_up_after_one_attempt() {
    let state = MockApi::default();
    state.me_unavailable.store(5, Ordering::SeqCst);
    let base_url = spawn_api(state.clone()).await;
    let api = HttpAuthApi::new(&ApiConfig::for_base_url(base_url)).unwrap();

    let err = api.me().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(state.me_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retry_can_be_disabled() {
    let state = MockApi::default();
    state.me_unavailable.store(1, Ordering::SeqCst);
    let base_url = spawn_api(state.clone()).await;
    let mut config = ApiConfig::for_base_url(base_url);
    config.retry = 0;
    let api = HttpAuthApi::new(&config).unwrap();

    assert_eq!(api.me().await.unwrap_err().status(), Some(503));
    assert_eq!(state.me_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_transient_status_is_not_retried() {
    let state = MockApi::default();
    let base_url = spawn_api(state.clone()).await;
    let api = HttpAuthApi::new(&ApiConfig::for_base_url(base_url)).unwrap();

    assert_eq!(api.me().await.unwrap_err().status(), Some(401));
    assert_eq!(state.me_calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// SESSION FLOWS
// =============================================================================

#[tokio::test]
async fn fresh_load_without_session_redirects_to_login() {
    let store = session_for(MockApi::default()).await;
    let router = Router::new(store.clone(), RouteTable::default());

    let settled = router.push("/dashboard").await.unwrap();

    assert_eq!(settled.full_path(), "/login?redirect=/dashboard");
    let state = store.snapshot();
    assert!(state.user.is_none());
    assert!(state.initialized);
    assert!(!state.loading);
}

#[tokio::test]
async fn login_cookie_authenticates_later_requests() {
    let state = MockApi::default();
    let store = session_for(state.clone()).await;
    let router = Router::new(store.clone(), RouteTable::default());
    router.push("/login").await.unwrap();

    let payload = store.login("a@b.com", "pw").await.unwrap();
    assert_eq!(payload.user.id, "1");
    assert!(store.is_authenticated());

    store.refresh().await;
    assert_eq!(store.user().map(|u| u.id), Some("1".to_owned()));
    assert_eq!(router.push("/dashboard").await.unwrap().full_path(), "/dashboard");
    assert_eq!(router.push("/login").await.unwrap().full_path(), "/dashboard");
    assert_eq!(state.me_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn wrong_password_surfaces_server_message() {
    let store = session_for(MockApi::default()).await;

    let err = store.login("a@b.com", "nope").await.unwrap_err();

    assert!(matches!(err, SessionError::Transport(TransportError::Status { status: 401, .. })));
    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(!store.is_authenticated());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn register_rejection_in_envelope_is_application_error() {
    let store = session_for(MockApi::default()).await;

    let err = store.register("a@b.com", "password1", "Alice").await.unwrap_err();

    assert!(matches!(err, SessionError::Application(ref e) if e.code == "REGISTRATION_ERROR"));
    assert_eq!(err.to_string(), "email already registered");
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn register_then_logout_clears_cookie_and_session() {
    let state = MockApi::default();
    let store = session_for(state.clone()).await;

    let payload = store.register("new@b.com", "password1", "Newbie").await.unwrap();
    assert_eq!(payload.user.name, "Newbie");
    assert!(store.is_authenticated());

    store.logout().await;
    assert!(!store.is_authenticated());
    assert_eq!(state.logout_calls.load(Ordering::SeqCst), 1);

    // The server expired the cookie, so the session stays gone on refresh.
    store.refresh().await;
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn logout_against_dead_server_still_clears_session() {
    let api = HttpAuthApi::new(&ApiConfig::for_base_url("http://127.0.0.1:9/api")).unwrap();
    let store = SessionStore::new(Arc::new(api));

    store.logout().await;

    assert!(!store.is_authenticated());
    assert!(!store.is_loading());
}
