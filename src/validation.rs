//! Input validation for the sign-in / sign-up form.
//!
//! DESIGN
//! ======
//! The three primitive validators (`validate_email`, `validate_name`,
//! `validate_password`) are pure and deterministic. `validate_form` layers
//! the form rules on top: required-field checks, sign-up-only name and
//! password-strength checks, and one message per invalid field.
//!
//! Password rules are reported in a fixed order (length, letter, digit,
//! special) so callers can surface the first violation deterministically.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::state::form::{AuthMode, Field, FormValues};

pub const MIN_NAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long";
pub const PASSWORD_NEEDS_LETTER: &str = "Password must contain at least one letter";
pub const PASSWORD_NEEDS_DIGIT: &str = "Password must contain at least one number";
pub const PASSWORD_NEEDS_SPECIAL: &str = "Password must contain at least one special character";

pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Please enter a valid email address";
pub const NAME_REQUIRED: &str = "Name is required";
pub const NAME_TOO_SHORT: &str = "Name must be at least 3 characters long";
pub const PASSWORD_REQUIRED: &str = "Password is required";

/// Human-readable password requirements, in rule order.
pub const PASSWORD_REQUIREMENTS: [&str; 4] = [
    "At least 8 characters",
    "At least one letter",
    "At least one number",
    "At least one special character",
];

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Outcome of [`validate_password`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordCheck {
    pub is_valid: bool,
    /// Violated rules, in rule order.
    pub errors: Vec<&'static str>,
}

impl PasswordCheck {
    /// First violated rule, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<&'static str> {
        self.errors.first().copied()
    }
}

/// Check for a conventional `local@domain.tld` shape.
#[must_use]
pub fn validate_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// A name is valid when it has at least three characters after trimming.
#[must_use]
pub fn validate_name(name: &str) -> bool {
    name.trim().chars().count() >= MIN_NAME_LENGTH
}

/// Check password strength, collecting every violated rule in order.
///
/// Letters and digits are ASCII; any other character counts as special.
#[must_use]
pub fn validate_password(password: &str) -> PasswordCheck {
    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(PASSWORD_TOO_SHORT);
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        errors.push(PASSWORD_NEEDS_LETTER);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(PASSWORD_NEEDS_DIGIT);
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push(PASSWORD_NEEDS_SPECIAL);
    }

    PasswordCheck { is_valid: errors.is_empty(), errors }
}

/// Field-scoped validation messages, one per invalid field.
pub type FieldErrors = BTreeMap<Field, String>;

/// Run the rules for `mode` over `values`.
///
/// Every invalid field gets an entry. Only the password strength check is
/// narrowed to its first violation.
#[must_use]
pub fn validate_form(mode: AuthMode, values: &FormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if values.email.is_empty() {
        errors.insert(Field::Email, EMAIL_REQUIRED.to_owned());
    } else if !validate_email(&values.email) {
        errors.insert(Field::Email, EMAIL_INVALID.to_owned());
    }

    if mode == AuthMode::SignUp {
        if values.name.trim().is_empty() {
            errors.insert(Field::Name, NAME_REQUIRED.to_owned());
        } else if !validate_name(&values.name) {
            errors.insert(Field::Name, NAME_TOO_SHORT.to_owned());
        }
    }

    if values.password.is_empty() {
        errors.insert(Field::Password, PASSWORD_REQUIRED.to_owned());
    } else if mode == AuthMode::SignUp {
        if let Some(first) = validate_password(&values.password).first_error() {
            errors.insert(Field::Password, first.to_owned());
        }
    }

    errors
}
