//! Liveness check.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::checkouts::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_sessions: usize,
}

/// GET /health — liveness plus the number of open checkout sessions.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_sessions: state.sessions.len(),
    })
}
