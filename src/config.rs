//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::storage::TOKEN_KEY;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 1500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const APP_DIR: &str = "authgate";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} (expected {expected})")]
    InvalidValue { var: &'static str, value: String, expected: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the authentication API, without a trailing slash.
    pub api_url: String,
    /// File holding the persisted bearer token.
    pub token_path: PathBuf,
    /// Pause between a successful submit and the redirect to the protected view.
    pub redirect_delay: Duration,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            token_path: default_token_path(),
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// All optional:
    /// - `AUTH_API_URL`: default `http://localhost:3000`
    /// - `AUTH_TOKEN_PATH`: default `<local data dir>/authgate/token`
    /// - `AUTH_REDIRECT_DELAY_MS`: default 1500
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("AUTH_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let token_path = std::env::var_os("AUTH_TOKEN_PATH")
            .filter(|v| !v.is_empty())
            .map_or_else(default_token_path, PathBuf::from);
        let redirect_delay =
            Duration::from_millis(env_parse_u64("AUTH_REDIRECT_DELAY_MS", DEFAULT_REDIRECT_DELAY_MS)?);
        let timeouts = Timeouts {
            request_secs: env_parse_u64("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_u64("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self { api_url: normalize_api_url(&api_url), token_path, redirect_delay, timeouts })
    }
}

pub(crate) fn normalize_api_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

fn default_token_path() -> PathBuf {
    dirs::data_local_dir()
        .map_or_else(|| PathBuf::from(format!(".{APP_DIR}")), |dir| dir.join(APP_DIR))
        .join(TOKEN_KEY)
}

fn env_parse_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
            var,
            value: raw,
            expected: "a non-negative integer",
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
