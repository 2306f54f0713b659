//! Wire DTOs for the authentication REST API.
//!
//! DESIGN
//! ======
//! Field names follow the server's JSON: the token arrives as
//! `access_token`, user timestamps as `createdAt` / `updatedAt`. User ids are
//! accepted as either strings or integers since both shapes occur in the
//! wild; they are normalized to `String`.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// An authenticated user as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address used to sign in.
    pub email: String,
    /// Creation timestamp as sent by the server, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last-update timestamp as sent by the server, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl User {
    /// Lay `fresh` over `self`.
    ///
    /// Same id: every field from `fresh` wins, absent timestamps keep their
    /// previous value. Different id: `fresh` replaces `self` wholesale.
    #[must_use]
    pub fn merged_with(&self, fresh: User) -> User {
        if self.id != fresh.id {
            return fresh;
        }
        User {
            created_at: fresh.created_at.or_else(|| self.created_at.clone()),
            updated_at: fresh.updated_at.or_else(|| self.updated_at.clone()),
            ..fresh
        }
    }
}

/// Successful `POST /auth/signup` or `POST /auth/signin` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// `POST /auth/logout` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Request body for `POST /auth/signup`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SignupData {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignupData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupData")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request body for `POST /auth/signin`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SigninData {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SigninData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigninData")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Error body the server sends with non-2xx responses.
///
/// `message` is either a single string or a list of validation messages.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default, deserialize_with = "deserialize_message")]
    pub message: Option<String>,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(D::Error::custom("expected string or integer id")),
    }
}

fn deserialize_message<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let message = match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    };
    Ok(message.filter(|m| !m.trim().is_empty()))
}
