//! Composition root.
//!
//! ARCHITECTURE
//! ============
//! `App` builds the single instance of every collaborator (token store,
//! API client, session store, navigator, form controller) and wires them:
//! - `start` subscribes to API events and runs the one-time bootstrap
//! - a 401 from any endpoint expires the session and returns to `/`, unless
//!   the rejected token has already been replaced
//! - `view` applies the route guards and yields what the current route shows
//!
//! Nothing below this module looks anything up globally; every collaborator
//! is handed its dependencies here.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::events::{ApiEvent, EventBus};
use crate::net::api::{ApiClient, ApiError, AuthApi};
use crate::net::types::User;
use crate::routes::{Guard, Navigator, Route, guard};
use crate::state::form::{FormController, FormState};
use crate::state::session::SessionStore;
use crate::storage::{FileTokenStore, TokenStore};

/// What the current route renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    /// Session still bootstrapping or refreshing.
    Loading,
    /// Entry route: the sign-in / sign-up form.
    AuthForm(FormState),
    /// Protected route.
    Application { user: User, greeting: String },
}

pub struct App {
    api: Arc<dyn AuthApi>,
    events: EventBus,
    session: Arc<SessionStore>,
    navigator: Navigator,
    form: FormController,
}

impl App {
    /// Wire the production collaborators from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_path.clone()));
        let events = EventBus::new();
        let api = Arc::new(ApiClient::new(config, tokens.clone(), events.clone())?);
        Ok(Self::new(api, tokens, events, config.redirect_delay))
    }

    #[must_use]
    pub fn new(
        api: Arc<dyn AuthApi>,
        tokens: Arc<dyn TokenStore>,
        events: EventBus,
        redirect_delay: Duration,
    ) -> Self {
        let session = Arc::new(SessionStore::new(api.clone(), tokens));
        let navigator = Navigator::new(Route::Entry);
        let form = FormController::new(session.clone(), navigator.clone(), redirect_delay);
        Self { api, events, session, navigator, form }
    }

    /// Subscribe to API events, then run the bootstrap check.
    ///
    /// The returned handle is the event listener; it runs until the event
    /// bus closes.
    pub async fn start(&self) -> JoinHandle<()> {
        let listener = self.spawn_event_listener();
        self.session.bootstrap().await;
        tracing::info!(status = ?self.session.snapshot().status(), "session bootstrapped");
        listener
    }

    fn spawn_event_listener(&self) -> JoinHandle<()> {
        let mut rx = self.events.subscribe();
        let session = self.session.clone();
        let navigator = self.navigator.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handle_event(&session, &navigator, &event),
                    Err(RecvError::Lagged(missed)) => {
                        // Dropped events are older than every buffered one.
                        tracing::warn!(missed, "api event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Apply the route guard to the current route.
    ///
    /// Navigates when the guard redirects. Returns the route to render, or
    /// `None` while the session is loading.
    pub fn resolve_route(&self) -> Option<Route> {
        let session = self.session.snapshot();
        match guard(self.navigator.current(), &session, self.form.redirect_pending()) {
            Guard::Loading => None,
            Guard::Redirect(to) => {
                self.navigator.navigate(to);
                Some(to)
            }
            Guard::Render => Some(self.navigator.current()),
        }
    }

    /// Render the current route.
    ///
    /// Not a pure read: this goes through [`App::resolve_route`], so a guard
    /// redirect moves the navigator before the target is rendered.
    pub fn view(&self) -> View {
        let Some(route) = self.resolve_route() else {
            return View::Loading;
        };

        match (route, self.session.snapshot().user) {
            (Route::Application, Some(user)) => {
                let greeting = greeting(&user);
                View::Application { user, greeting }
            }
            _ => View::AuthForm(self.form.snapshot()),
        }
    }

    /// Logout action of the protected view: end the session, return to `/`.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.navigator.navigate(Route::Entry);
    }

    /// Public user listing.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.api.users().await
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn form(&self) -> &FormController {
        &self.form
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }
}

fn handle_event(session: &SessionStore, navigator: &Navigator, event: &ApiEvent) {
    match event {
        ApiEvent::SessionExpired { endpoint, rejected_token } => {
            if session.expire_rejected(rejected_token.as_deref()) {
                tracing::info!(endpoint, "session expired; returning to entry route");
                navigator.navigate(Route::Entry);
            }
        }
    }
}

fn greeting(user: &User) -> String {
    let name = user.name.trim();
    format!("Hello, {}!", if name.is_empty() { "User" } else { name })
}
