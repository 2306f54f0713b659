use super::*;
use crate::storage::MemoryTokenStore;

use std::sync::Mutex;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode as AxumStatus};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

// =============================================================
// Mock server
// =============================================================

#[derive(Clone, Default)]
struct Recorded {
    auth_headers: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl Recorded {
    fn record(&self, path: &str, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.auth_headers.lock().unwrap().push((path.to_owned(), auth));
    }

    fn headers_for(&self, path: &str) -> Vec<Option<String>> {
        self.auth_headers
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, h)| h.clone())
            .collect()
    }
}

fn user_json() -> serde_json::Value {
    serde_json::json!({"id": "u-1", "name": "Ada", "email": "ada@example.com"})
}

fn unauthorized(message: &str) -> Response {
    (AxumStatus::UNAUTHORIZED, Json(serde_json::json!({"statusCode": 401, "message": message}))).into_response()
}

async fn signup(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<serde_json::Value>) -> Response {
    rec.record(SIGNUP_PATH, &headers);
    if body["email"] == "taken@example.com" {
        return (AxumStatus::CONFLICT, Json(serde_json::json!({"message": "Email already in use"}))).into_response();
    }
    if body["name"].as_str().is_none() || body["password"].as_str().is_none() {
        return (AxumStatus::BAD_REQUEST, Json(serde_json::json!({"message": ["name missing"]}))).into_response();
    }
    Json(serde_json::json!({"access_token": "new-token", "user": user_json()})).into_response()
}

async fn signin(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<serde_json::Value>) -> Response {
    rec.record(SIGNIN_PATH, &headers);
    if body["password"] == "Abcdef12!" {
        Json(serde_json::json!({"access_token": "good", "user": user_json()})).into_response()
    } else {
        unauthorized("Invalid credentials")
    }
}

async fn logout(State(rec): State<Recorded>, headers: HeaderMap) -> Response {
    rec.record(LOGOUT_PATH, &headers);
    (AxumStatus::INTERNAL_SERVER_ERROR, "not json").into_response()
}

async fn profile(State(rec): State<Recorded>, headers: HeaderMap) -> Response {
    rec.record(PROFILE_PATH, &headers);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer good") => Json(user_json()).into_response(),
        Some("Bearer garbled") => "{not json".into_response(),
        _ => unauthorized("Unauthorized"),
    }
}

async fn users(State(rec): State<Recorded>, headers: HeaderMap) -> Response {
    rec.record(USERS_PATH, &headers);
    Json(serde_json::json!([user_json(), {"id": 7, "name": "Grace", "email": "grace@example.com"}])).into_response()
}

async fn spawn_mock() -> (String, Recorded) {
    let recorded = Recorded::default();
    let router = Router::new()
        .route(SIGNUP_PATH, post(signup))
        .route(SIGNIN_PATH, post(signin))
        .route(LOGOUT_PATH, post(logout))
        .route(PROFILE_PATH, get(profile))
        .route(USERS_PATH, get(users))
        .with_state(recorded.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), recorded)
}

fn client(base_url: &str, tokens: Arc<dyn TokenStore>, events: EventBus) -> ApiClient {
    let config = ClientConfig { api_url: base_url.to_owned(), ..ClientConfig::default() };
    ApiClient::new(&config, tokens, events).unwrap()
}

fn credentials(password: &str) -> SigninData {
    SigninData { email: "ada@example.com".to_owned(), password: password.to_owned() }
}

// =============================================================
// Happy paths
// =============================================================

#[tokio::test]
async fn signin_returns_token_and_user() {
    let (base, _) = spawn_mock().await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()), EventBus::new());
    let resp = api.signin(&credentials("Abcdef12!")).await.unwrap();
    assert_eq!(resp.access_token, "good");
    assert_eq!(resp.user.name, "Ada");
}

#[tokio::test]
async fn signup_posts_body_and_returns_token() {
    let (base, _) = spawn_mock().await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()), EventBus::new());
    let data =
        SignupData { name: "Ada".to_owned(), email: "ada@example.com".to_owned(), password: "Abcdef12!".to_owned() };
    let resp = api.signup(&data).await.unwrap();
    assert_eq!(resp.access_token, "new-token");
}

#[tokio::test]
async fn users_lists_public_users() {
    let (base, _) = spawn_mock().await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()), EventBus::new());
    let list = api.users().await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[1].id, "7");
}

#[test]
fn base_url_trailing_slash_is_trimmed() {
    let api = client("http://127.0.0.1:9/", Arc::new(MemoryTokenStore::new()), EventBus::new());
    assert_eq!(api.base_url(), "http://127.0.0.1:9");
}

// =============================================================
// Bearer header
// =============================================================

#[tokio::test]
async fn persisted_token_is_attached_as_bearer() {
    let (base, rec) = spawn_mock().await;
    let api = client(&base, Arc::new(MemoryTokenStore::with_token("good")), EventBus::new());
    let user = api.profile().await.unwrap();
    assert_eq!(user.id, "u-1");
    assert_eq!(rec.headers_for(PROFILE_PATH), vec![Some("Bearer good".to_owned())]);
}

#[tokio::test]
async fn no_token_means_no_authorization_header() {
    let (base, rec) = spawn_mock().await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()), EventBus::new());
    let _ = api.users().await.unwrap();
    assert_eq!(rec.headers_for(USERS_PATH), vec![None]);
}

#[tokio::test]
async fn token_is_read_on_every_request() {
    let (base, rec) = spawn_mock().await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let api = client(&base, tokens.clone(), EventBus::new());
    let _ = api.users().await;
    tokens.save("good").unwrap();
    let _ = api.users().await;
    assert_eq!(rec.headers_for(USERS_PATH), vec![None, Some("Bearer good".to_owned())]);
}

// =============================================================
// 401 handling
// =============================================================

#[tokio::test]
async fn profile_401_publishes_session_expired() {
    let (base, _) = spawn_mock().await;
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let tokens = Arc::new(MemoryTokenStore::with_token("stale"));
    let api = client(&base, tokens.clone(), events);

    let err = api.profile().await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired { .. }));
    assert_eq!(err.status(), Some(401));
    assert_eq!(rx.recv().await.unwrap(), ApiEvent::SessionExpired {
        endpoint: PROFILE_PATH.to_owned(),
        rejected_token: Some("stale".to_owned()),
    });
    // Clearing storage is the subscriber's job.
    assert_eq!(tokens.load().unwrap().as_deref(), Some("stale"));
}

#[tokio::test]
async fn signin_401_carries_server_message_and_publishes() {
    let (base, _) = spawn_mock().await;
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let api = client(&base, Arc::new(MemoryTokenStore::new()), events);

    let err = api.signin(&credentials("wrong")).await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid credentials");
    assert_eq!(rx.recv().await.unwrap(), ApiEvent::SessionExpired { endpoint: SIGNIN_PATH.to_owned(), rejected_token: None });
}

// =============================================================
// Other failures
// =============================================================

#[tokio::test]
async fn non_2xx_carries_server_message() {
    let (base, _) = spawn_mock().await;
    let api = client(&base, Arc::new(MemoryTokenStore::new()), EventBus::new());
    let data = SignupData {
        name: "Ada".to_owned(),
        email: "taken@example.com".to_owned(),
        password: "Abcdef12!".to_owned(),
    };
    let err = api.signup(&data).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.user_message(), "Email already in use");
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_generic_message() {
    let (base, _) = spawn_mock().await;
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let api = client(&base, Arc::new(MemoryTokenStore::with_token("good")), events);
    let err = api.logout().await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500, message: None }));
    assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let (base, _) = spawn_mock().await;
    let api = client(&base, Arc::new(MemoryTokenStore::with_token("garbled")), EventBus::new());
    let err = api.profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(&format!("http://{addr}"), Arc::new(MemoryTokenStore::new()), EventBus::new());
    let err = api.users().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    assert_eq!(err.status(), None);
}

// =============================================================
// ApiError
// =============================================================

#[test]
fn error_display_includes_message() {
    let err = ApiError::Server { status: 409, message: Some("taken".to_owned()) };
    assert_eq!(err.to_string(), "server error: status 409: taken");
    let err = ApiError::SessionExpired { message: None };
    assert_eq!(err.to_string(), "session expired: unauthorized");
}
