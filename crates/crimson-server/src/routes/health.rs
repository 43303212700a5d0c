//! Liveness and session store status.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Status report for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Backend the sessions live in.
    pub provider: String,
    /// Live sessions right now.
    pub live_sessions: usize,
    /// Whether idle sessions are being evicted in the background.
    pub sweeper_running: bool,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let manager = &state.manager;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: manager.config().provider.clone(),
        live_sessions: manager.store().len(),
        sweeper_running: state.sweeper_running(),
    })
}

/// Create health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
