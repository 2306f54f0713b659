//! Scripted [`AuthApi`] double shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::events::{ApiEvent, EventBus};
use crate::net::api::{ApiError, AuthApi};
use crate::net::types::{AuthResponse, MessageResponse, SigninData, SignupData, User};
use crate::storage::TokenStore;

pub fn sample_user() -> User {
    User {
        id: "u-1".to_owned(),
        name: "Ada".to_owned(),
        email: "ada@example.com".to_owned(),
        created_at: Some("2024-01-01T00:00:00Z".to_owned()),
        updated_at: None,
    }
}

pub fn auth_response(token: &str) -> AuthResponse {
    AuthResponse { access_token: token.to_owned(), user: sample_user() }
}

pub fn expired(message: &str) -> ApiError {
    ApiError::SessionExpired { message: Some(message.to_owned()) }
}

type Queue<T> = Mutex<VecDeque<Result<T, ApiError>>>;

/// Each endpoint pops its next scripted result; an empty queue yields a
/// network error. Scripted 401s are published on the attached bus the way
/// `ApiClient` does, naming the token read from the attached store.
#[derive(Default)]
pub struct MockApi {
    signup: Queue<AuthResponse>,
    signin: Queue<AuthResponse>,
    logout: Queue<MessageResponse>,
    profile: Queue<User>,
    users: Queue<Vec<User>>,
    calls: Mutex<Vec<&'static str>>,
    events: Option<EventBus>,
    tokens: Option<Arc<dyn TokenStore>>,
    gate: Option<Arc<Notify>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Read the bearer token from `tokens` on every call.
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Hold signup/signin until the gate is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn push_signup(self, result: Result<AuthResponse, ApiError>) -> Self {
        self.signup.lock().unwrap().push_back(result);
        self
    }

    pub fn push_signin(self, result: Result<AuthResponse, ApiError>) -> Self {
        self.signin.lock().unwrap().push_back(result);
        self
    }

    pub fn push_logout(self, result: Result<MessageResponse, ApiError>) -> Self {
        self.logout.lock().unwrap().push_back(result);
        self
    }

    pub fn push_profile(self, result: Result<User, ApiError>) -> Self {
        self.profile.lock().unwrap().push_back(result);
        self
    }

    pub fn push_users(self, result: Result<Vec<User>, ApiError>) -> Self {
        self.users.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == endpoint).count()
    }

    fn next<T>(&self, endpoint: &'static str, queue: &Queue<T>) -> Result<T, ApiError> {
        self.calls.lock().unwrap().push(endpoint);
        let bearer = self.tokens.as_ref().and_then(|t| t.load().unwrap());
        let result = queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network(format!("unscripted call to {endpoint}"))));
        if let (Err(ApiError::SessionExpired { .. }), Some(events)) = (&result, &self.events) {
            events.publish(ApiEvent::SessionExpired { endpoint: endpoint.to_owned(), rejected_token: bearer });
        }
        result
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for MockApi {
    async fn signup(&self, _data: &SignupData) -> Result<AuthResponse, ApiError> {
        self.wait_gate().await;
        self.next("signup", &self.signup)
    }

    async fn signin(&self, _credentials: &SigninData) -> Result<AuthResponse, ApiError> {
        self.wait_gate().await;
        self.next("signin", &self.signin)
    }

    async fn logout(&self) -> Result<MessageResponse, ApiError> {
        self.next("logout", &self.logout)
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.next("profile", &self.profile)
    }

    async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.next("users", &self.users)
    }
}
