//! Lightweight service health endpoint used for readiness checks and tests.

use crate::sync::SyncConfig;
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

/// Basic response payload describing API health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// Static status string reporting application readiness.
    pub status: String,
    /// Whether an upstream API token is configured; runs are refused without one.
    #[serde(rename = "tokenConfigured")]
    pub token_configured: bool,
}

/// Health check endpoint returning a trivial JSON payload.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check(config: &State<SyncConfig>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        token_configured: config.has_api_token(),
    })
}
