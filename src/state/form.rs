//! Sign-in / sign-up form controller.
//!
//! DESIGN
//! ======
//! The controller owns the form's local state (mode, field values, error
//! map, success message, submitting flag) and drives validation, the session
//! store, and the post-success redirect. State sits behind a short-lived
//! lock that is never held across an await, so a snapshot can be read while
//! a submission is in flight.
//!
//! Submission protocol:
//! 1. validate every field for the current mode; any error aborts with no
//!    network call
//! 2. mark submitting, clear stale errors/messages, call signup or signin
//! 3. success shows a message, resets the fields and schedules the redirect
//!    after a fixed delay; failure fills the general error slot
//! 4. the submitting flag is always cleared once the attempt settles

#[cfg(test)]
#[path = "form_test.rs"]
mod form_test;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::session::SessionStore;
use crate::net::types::{SigninData, SignupData};
use crate::routes::{Navigator, Route};
use crate::validation::{FieldErrors, validate_form};

pub const SIGNUP_SUCCESS: &str = "Account created successfully! Redirecting...";
pub const SIGNIN_SUCCESS: &str = "Signed in successfully! Redirecting...";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::SignIn => Self::SignUp,
            Self::SignUp => Self::SignIn,
        }
    }

    /// Input fields shown in this mode.
    #[must_use]
    pub fn fields(self) -> &'static [Field] {
        match self {
            Self::SignIn => &[Field::Email, Field::Password],
            Self::SignUp => &[Field::Name, Field::Email, Field::Password],
        }
    }
}

/// Error-map key. `General` is the non-field slot for server/network errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    General,
}

impl Field {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Password => "password",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for FormValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValues")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    pub mode: AuthMode,
    pub values: FormValues,
    pub errors: FieldErrors,
    pub success: Option<String>,
    pub is_submitting: bool,
}

impl FormState {
    #[must_use]
    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn general_error(&self) -> Option<&str> {
        self.error(Field::General)
    }
}

/// Result of [`FormController::submit`].
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// A submission is already in flight; this one was ignored.
    Busy,
    /// The session store rejected the attempt; the message is shown in the
    /// general error slot.
    Failed(String),
    /// Authenticated. `redirect` completes once navigation has happened.
    Succeeded { redirect: JoinHandle<()> },
}

pub struct FormController {
    session: Arc<SessionStore>,
    navigator: Navigator,
    redirect_delay: Duration,
    state: Mutex<FormState>,
    redirect_pending: Arc<AtomicBool>,
}

impl FormController {
    #[must_use]
    pub fn new(session: Arc<SessionStore>, navigator: Navigator, redirect_delay: Duration) -> Self {
        Self {
            session,
            navigator,
            redirect_delay,
            state: Mutex::new(FormState::default()),
            redirect_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FormState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    #[must_use]
    pub fn snapshot(&self) -> FormState {
        self.with_state(|s| s.clone())
    }

    /// True between a successful submit and the redirect it scheduled.
    #[must_use]
    pub fn redirect_pending(&self) -> bool {
        self.redirect_pending.load(Ordering::Acquire)
    }

    /// Switch between sign-in and sign-up, clearing fields, errors and
    /// messages.
    pub fn toggle_mode(&self) {
        self.with_state(|s| {
            s.mode = s.mode.toggled();
            s.values = FormValues::default();
            s.errors.clear();
            s.success = None;
        });
    }

    /// Record typed input. Clears that field's error and any success message.
    pub fn set_field(&self, field: Field, value: impl Into<String>) {
        let value = value.into();
        self.with_state(|s| {
            let slot = match field {
                Field::Name => &mut s.values.name,
                Field::Email => &mut s.values.email,
                Field::Password => &mut s.values.password,
                Field::General => return,
            };
            *slot = value;
            s.errors.remove(&field);
            s.success = None;
        });
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let prepared = self.with_state(|s| {
            if s.is_submitting {
                return Err(SubmitOutcome::Busy);
            }
            let errors = validate_form(s.mode, &s.values);
            if !errors.is_empty() {
                s.errors.clone_from(&errors);
                s.success = None;
                return Err(SubmitOutcome::Invalid(errors));
            }
            s.errors.clear();
            s.success = None;
            s.is_submitting = true;
            Ok((s.mode, s.values.clone()))
        });
        let (mode, values) = match prepared {
            Ok(prepared) => prepared,
            Err(outcome) => {
                if let SubmitOutcome::Invalid(errors) = &outcome {
                    tracing::debug!(fields = ?errors.keys().collect::<Vec<_>>(), "form rejected by validation");
                }
                return outcome;
            }
        };

        let result = match mode {
            AuthMode::SignUp => {
                let data = SignupData { name: values.name.trim().to_owned(), email: values.email, password: values.password };
                self.session.signup(&data).await.map(|_| SIGNUP_SUCCESS)
            }
            AuthMode::SignIn => {
                let credentials = SigninData { email: values.email, password: values.password };
                self.session.signin(&credentials).await.map(|_| SIGNIN_SUCCESS)
            }
        };

        match result {
            Ok(message) => {
                self.with_state(|s| {
                    s.is_submitting = false;
                    s.values = FormValues::default();
                    s.success = Some(message.to_owned());
                });
                SubmitOutcome::Succeeded { redirect: self.schedule_redirect() }
            }
            Err(e) => {
                let message = e.user_message();
                tracing::info!(error = %e, ?mode, "form submission failed");
                self.with_state(|s| {
                    s.is_submitting = false;
                    s.errors.insert(Field::General, message.clone());
                });
                SubmitOutcome::Failed(message)
            }
        }
    }

    fn schedule_redirect(&self) -> JoinHandle<()> {
        let deadline = tokio::time::Instant::now() + self.redirect_delay;
        let navigator = self.navigator.clone();
        let pending = self.redirect_pending.clone();
        pending.store(true, Ordering::Release);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            navigator.navigate(Route::Application);
            pending.store(false, Ordering::Release);
        })
    }
}
