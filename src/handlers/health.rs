//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::constants::APP_VERSION;
use crate::ingest::StatsSnapshot;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    ingestion: StatsSnapshot,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: APP_VERSION,
        timestamp: chrono::Utc::now().timestamp(),
        ingestion: state.stats.snapshot(),
    })
}
