use super::orchestrator::SyncOutcome;
use chrono::{DateTime, Utc};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Snapshot of the current or most recent run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunState {
    pub run_id: Option<String>,
    pub state: SyncState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_synced: u64,
    pub pages_processed: u32,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl Default for SyncRunState {
    fn default() -> Self {
        Self {
            run_id: None,
            state: SyncState::Idle,
            started_at: None,
            finished_at: None,
            total_synced: 0,
            pages_processed: 0,
            error_kind: None,
            error_message: None,
        }
    }
}

struct TrackerInner {
    run: SyncRunState,
    cancellation: Option<CancellationToken>,
}

/// Keeps at most one sync run in flight and remembers how the last one ended.
pub struct SyncRunTracker {
    inner: Mutex<TrackerInner>,
}

impl SyncRunTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                run: SyncRunState::default(),
                cancellation: None,
            }),
        }
    }

    pub async fn snapshot(&self) -> SyncRunState {
        self.inner.lock().await.run.clone()
    }

    /// Move to `Running` and hand out the run's cancellation token.
    pub async fn start_run(&self) -> Result<CancellationToken, String> {
        let mut inner = self.inner.lock().await;

        if inner.run.state == SyncState::Running {
            return Err("A sync run is already in progress".to_string());
        }

        let token = CancellationToken::new();
        inner.run = SyncRunState {
            run_id: Some(Uuid::new_v4().to_string()),
            state: SyncState::Running,
            started_at: Some(Utc::now()),
            ..SyncRunState::default()
        };
        inner.cancellation = Some(token.clone());

        Ok(token)
    }

    pub async fn finish_run(&self, outcome: &SyncOutcome) {
        let mut inner = self.inner.lock().await;
        inner.cancellation = None;
        inner.run.finished_at = Some(Utc::now());

        match outcome {
            Ok(totals) => {
                inner.run.state = SyncState::Completed;
                inner.run.total_synced = totals.total_synced;
                inner.run.pages_processed = totals.pages_processed;
            }
            Err(abort) => {
                inner.run.state = SyncState::Aborted;
                inner.run.total_synced = abort.totals.total_synced;
                inner.run.pages_processed = abort.totals.pages_processed;
                inner.run.error_kind = Some(abort.error.kind().to_string());
                inner.run.error_message = Some(abort.error.to_string());
            }
        }
    }

    /// Signal the in-flight run to stop between pages. Returns false when idle.
    pub async fn cancel_run(&self) -> bool {
        let inner = self.inner.lock().await;
        match &inner.cancellation {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl Default for SyncRunTracker {
    fn default() -> Self {
        Self::new()
    }
}
