use reqwest::StatusCode;
use rocket_db_pools::sqlx;
use thiserror::Error;

/// Everything that can abort a sync run.
///
/// End-of-pages and empty pages are not errors; they are reported through
/// [`PageResult`](crate::sync::fetcher::PageResult) and end the run successfully.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },
    #[error("unexpected upstream response: {0}")]
    UpstreamData(String),
    #[error("invalid product record: {0}")]
    Normalization(String),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    pub fn missing_setting(key: &str) -> Self {
        SyncError::Configuration(format!("{key} is not set"))
    }

    /// Short machine-readable label for logs and run status.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Configuration(_) => "configuration",
            SyncError::Transport(_) | SyncError::UpstreamStatus { .. } => "transport",
            SyncError::UpstreamData(_) => "upstream_data",
            SyncError::Normalization(_) => "normalization",
            SyncError::Storage(_) => "storage",
            SyncError::Cancelled => "cancelled",
        }
    }
}
