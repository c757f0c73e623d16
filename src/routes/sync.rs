//! Endpoints that trigger, inspect and cancel catalog sync runs.

use crate::error::ApiError;
use crate::sync::jobs::{SyncRunState, SyncRunTracker};
use crate::sync::orchestrator::ReportStatus;
use crate::sync::{SyncConfig, SyncError, SyncOutcome, SyncReport, run_with_pool};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{Request, State, get, post};
use rocket_db_pools::sqlx;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;

/// Sync result paired with the HTTP status that matches it.
#[derive(Debug)]
pub struct SyncResponse {
    status: Status,
    report: SyncReport,
}

impl SyncResponse {
    pub fn from_outcome(outcome: &SyncOutcome) -> Self {
        let status = match outcome {
            Ok(_) => Status::Ok,
            Err(abort) => error_status(&abort.error),
        };

        Self {
            status,
            report: SyncReport::from_outcome(outcome),
        }
    }

    /// Refusal for a trigger that overlaps a run still in progress.
    pub fn conflict(message: String) -> Self {
        Self {
            status: Status::Conflict,
            report: SyncReport {
                status: ReportStatus::Error,
                total_synced: 0,
                pages_processed: 0,
                message: Some(message),
            },
        }
    }
}

fn error_status(error: &SyncError) -> Status {
    match error {
        SyncError::Configuration(_) => Status::ServiceUnavailable,
        SyncError::Transport(_)
        | SyncError::UpstreamStatus { .. }
        | SyncError::UpstreamData(_)
        | SyncError::Normalization(_) => Status::BadGateway,
        SyncError::Storage(_) => Status::InternalServerError,
        SyncError::Cancelled => Status::Conflict,
    }
}

impl<'r> Responder<'r, 'static> for SyncResponse {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        (self.status, Json(self.report)).respond_to(request)
    }
}

impl OpenApiResponderInner for SyncResponse {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        // Refused and aborted runs carry the same report body as successful ones.
        let mut responses = Json::<SyncReport>::responses(generator)?;
        if let Some(report) = responses.responses.get("200").cloned() {
            for code in ["409", "500", "502", "503"] {
                responses.responses.insert(code.to_string(), report.clone());
            }
        }
        Ok(responses)
    }
}

/// Simple message wrapper for acknowledgement responses.
#[derive(Debug, Serialize, JsonSchema)]
pub struct MessageResponse {
    /// Response text.
    message: String,
}

/// Run a full catalog sync and wait for it to finish.
///
/// Returns 409 when another run is still in progress.
#[openapi(tag = "Sync")]
#[post("/sync/run")]
pub async fn run_sync(
    config: &State<SyncConfig>,
    tracker: &State<SyncRunTracker>,
    pool: &State<sqlx::PgPool>,
) -> SyncResponse {
    // Configuration problems are reported without the run ever starting.
    if let Err(error) = config.credentials() {
        log::error!("sync refused: {}", error);
        return SyncResponse::from_outcome(&Err(error.into()));
    }

    let cancel = match tracker.start_run().await {
        Ok(cancel) => cancel,
        Err(message) => {
            log::info!("sync refused: {}", message);
            return SyncResponse::conflict(message);
        }
    };
    let outcome = run_with_pool(config.inner(), pool.inner(), cancel).await;
    tracker.finish_run(&outcome).await;

    SyncResponse::from_outcome(&outcome)
}

/// State of the current or most recent sync run.
#[openapi(tag = "Sync")]
#[get("/sync/status")]
pub async fn get_sync_status(tracker: &State<SyncRunTracker>) -> Json<SyncRunState> {
    Json(tracker.snapshot().await)
}

/// Ask the in-flight run to stop after its current page.
#[openapi(tag = "Sync")]
#[post("/sync/cancel")]
pub async fn cancel_sync(
    tracker: &State<SyncRunTracker>,
) -> Result<Json<MessageResponse>, ApiError> {
    if tracker.cancel_run().await {
        Ok(Json(MessageResponse {
            message: "Cancellation requested".to_string(),
        }))
    } else {
        Err(ApiError::BadRequest("No sync run in progress".to_string()))
    }
}
