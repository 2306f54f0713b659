//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `SessionStore` lives for the whole process. Route guards, the form
//! controller and the protected view all observe it through a `watch`
//! channel, so every observer sees whole snapshots: clearing the user and
//! the token on expiry is never observed half-done.
//!
//! LIFECYCLE
//! =========
//! `bootstrapping → {authenticated, anonymous}`; `authenticated → anonymous`
//! on logout or 401. Bootstrap runs at most once per store, and signup or
//! signin wait for it so a late bootstrap result never overwrites them.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell, watch};

use crate::net::api::{ApiError, AuthApi};
use crate::net::types::{AuthResponse, SigninData, SignupData, User};
use crate::storage::{StorageError, TokenStore};

/// Coarse session phase derived from a [`Session`] snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Bootstrapping,
    Authenticated,
    Anonymous,
}

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    /// True during bootstrap and while a profile fetch is in flight.
    pub loading: bool,
    /// Set once the startup token check has finished.
    pub bootstrapped: bool,
}

impl Session {
    fn initial() -> Self {
        Self { user: None, loading: true, bootstrapped: false }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match (&self.user, self.bootstrapped) {
            (Some(_), _) => SessionStatus::Authenticated,
            (None, false) => SessionStatus::Bootstrapping,
            (None, true) => SessionStatus::Anonymous,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("an authentication request is already in flight")]
    InFlight,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Message suitable for the form's general error slot.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            Self::InFlight => "A request is already in progress".to_owned(),
            Self::Storage(_) => crate::net::api::GENERIC_ERROR_MESSAGE.to_owned(),
        }
    }
}

/// Owns the session snapshot and every transition between states.
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    tokens: Arc<dyn TokenStore>,
    state: watch::Sender<Session>,
    bootstrap: OnceCell<()>,
    auth_in_flight: Mutex<()>,
}

impl SessionStore {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, tokens: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(Session::initial());
        Self { api, tokens, state, bootstrap: OnceCell::new(), auth_in_flight: Mutex::new(()) }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Observe every future snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Recover a session from the persisted token.
    ///
    /// With a token: fetch the profile; success authenticates, any failure
    /// removes the token and leaves the session anonymous. Without a token
    /// the session is anonymous immediately. Errors are never surfaced.
    /// Later calls return without doing anything.
    pub async fn bootstrap(&self) {
        self.bootstrap.get_or_init(|| self.run_bootstrap()).await;
    }

    async fn run_bootstrap(&self) {
        let token = match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "token unreadable at bootstrap; starting anonymous");
                None
            }
        };

        if token.is_none() {
            tracing::debug!("no persisted token; starting anonymous");
            self.state.send_modify(|s| {
                s.loading = false;
                s.bootstrapped = true;
            });
            return;
        }

        self.state.send_modify(|s| s.loading = true);
        match self.api.profile().await {
            Ok(fresh) => {
                tracing::info!(user_id = %fresh.id, "session restored from persisted token");
                self.state.send_modify(|s| {
                    s.user = Some(merge_user(s.user.as_ref(), fresh));
                    s.loading = false;
                    s.bootstrapped = true;
                });
            }
            Err(e) => {
                tracing::info!(error = %e, "persisted token rejected; starting anonymous");
                self.clear_token();
                self.state.send_modify(|s| {
                    s.user = None;
                    s.loading = false;
                    s.bootstrapped = true;
                });
            }
        }
    }

    /// Create an account and authenticate as it.
    ///
    /// Waits for bootstrap to settle first.
    ///
    /// # Errors
    ///
    /// API errors are returned untouched. `InFlight` if another signup or
    /// signin is pending; `Storage` if the token cannot be persisted.
    pub async fn signup(&self, data: &SignupData) -> Result<AuthResponse, SessionError> {
        let _permit = self.auth_in_flight.try_lock().map_err(|_| SessionError::InFlight)?;
        self.bootstrap().await;
        let response = self.api.signup(data).await?;
        self.establish(&response)?;
        tracing::info!(user_id = %response.user.id, "signed up");
        Ok(response)
    }

    /// Authenticate with existing credentials.
    ///
    /// # Errors
    ///
    /// Same as [`SessionStore::signup`].
    pub async fn signin(&self, credentials: &SigninData) -> Result<AuthResponse, SessionError> {
        let _permit = self.auth_in_flight.try_lock().map_err(|_| SessionError::InFlight)?;
        self.bootstrap().await;
        let response = self.api.signin(credentials).await?;
        self.establish(&response)?;
        tracing::info!(user_id = %response.user.id, "signed in");
        Ok(response)
    }

    // Token write and user swap happen under the state lock, the same lock
    // `expire_rejected` compares under.
    fn establish(&self, response: &AuthResponse) -> Result<(), StorageError> {
        let user = response.user.clone();
        let mut saved = Ok(());
        self.state.send_if_modified(|s| {
            saved = self.tokens.save(&response.access_token);
            if saved.is_err() {
                return false;
            }
            s.user = Some(user);
            s.bootstrapped = true;
            true
        });
        saved
    }

    /// End the session.
    ///
    /// The remote call's outcome is only logged: the token is removed and
    /// the user cleared whatever happens.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "remote logout failed; ending session locally");
        }
        self.expire();
        tracing::info!("logged out");
    }

    /// Re-fetch the current user and merge it over the previous snapshot.
    ///
    /// # Errors
    ///
    /// API errors are returned untouched; the session is left as it was.
    pub async fn fetch_profile(&self) -> Result<User, SessionError> {
        self.state.send_modify(|s| s.loading = true);
        let result = self.api.profile().await;
        match result {
            Ok(fresh) => {
                let returned = fresh.clone();
                self.state.send_modify(|s| {
                    s.user = Some(merge_user(s.user.as_ref(), fresh));
                    s.loading = false;
                });
                Ok(returned)
            }
            Err(e) => {
                self.state.send_modify(|s| s.loading = false);
                Err(e.into())
            }
        }
    }

    /// Drop the token and the user in one step. Idempotent.
    pub fn expire(&self) {
        self.clear_token();
        self.state.send_if_modified(|s| s.user.take().is_some());
    }

    /// Expire only if `rejected` is still the persisted token.
    ///
    /// A 401 reported for a token that has since been replaced (a fresh
    /// signin after the rejected request) leaves the session alone. Returns
    /// whether the session was expired.
    pub fn expire_rejected(&self, rejected: Option<&str>) -> bool {
        let mut expired = false;
        self.state.send_if_modified(|s| {
            match self.tokens.load() {
                Ok(current) if current.as_deref() != rejected => {
                    tracing::debug!("401 refers to a replaced token; session kept");
                    return false;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "token unreadable while handling 401; expiring"),
            }
            self.clear_token();
            expired = true;
            s.user.take().is_some()
        });
        expired
    }

    fn clear_token(&self) {
        if let Err(e) = self.tokens.clear() {
            tracing::warn!(error = %e, "failed to remove persisted token");
        }
    }
}

fn merge_user(previous: Option<&User>, fresh: User) -> User {
    match previous {
        Some(prev) => prev.merged_with(fresh),
        None => fresh,
    }
}
