use axum::{extract::State, response::IntoResponse, Json};

use crate::gateway::AppState;

/// `GET /api/status`
pub(crate) async fn status_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/health`
pub(crate) async fn api_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "connections": state.sessions.len(),
    }))
}
