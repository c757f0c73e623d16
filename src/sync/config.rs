use super::error::SyncError;
use std::env;
use std::fmt;
use std::time::Duration;

pub const API_TOKEN_VAR: &str = "TINY_API_TOKEN";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const DEFAULT_API_BASE_URL: &str = "https://api.tiny.com.br/api2";

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_blank)
}

fn env_string(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Settings for one catalog sync run.
///
/// Loaded once by the process bootstrap and handed to every run; nothing in
/// the pipeline reads the environment on its own.
#[derive(Clone)]
pub struct SyncConfig {
    pub api_token: Option<String>,
    pub database_url: Option<String>,
    pub api_base_url: String,
    /// Pause between two page requests.
    pub page_delay: Duration,
    pub request_timeout: Duration,
}

/// The two settings a run cannot start without.
#[derive(Clone)]
pub struct SyncCredentials {
    pub api_token: String,
    pub database_url: String,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            api_token: env_optional(API_TOKEN_VAR),
            database_url: env_optional(DATABASE_URL_VAR),
            api_base_url: env_string("TINY_API_BASE_URL", DEFAULT_API_BASE_URL),
            page_delay: env_duration_millis("SYNC_PAGE_DELAY_MS", 1_000),
            request_timeout: env_duration_millis("SYNC_REQUEST_TIMEOUT_MS", 30_000),
        }
    }

    pub fn has_api_token(&self) -> bool {
        self.api_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }

    /// Check that both required settings are present.
    pub fn credentials(&self) -> Result<SyncCredentials, SyncError> {
        let api_token = self
            .api_token
            .clone()
            .and_then(non_blank)
            .ok_or_else(|| SyncError::missing_setting(API_TOKEN_VAR))?;
        let database_url = self
            .database_url
            .clone()
            .and_then(non_blank)
            .ok_or_else(|| SyncError::missing_setting(DATABASE_URL_VAR))?;

        Ok(SyncCredentials {
            api_token,
            database_url,
        })
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<redacted>"),
            )
            .field("api_base_url", &self.api_base_url)
            .field("page_delay", &self.page_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
