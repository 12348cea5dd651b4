use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backend_healthy = state.backend.is_healthy();

    Json(serde_json::json!({
        "status": if backend_healthy { "healthy" } else { "degraded" },
        "backend": {
            "url": state.backend.url,
            "healthy": backend_healthy,
        },
        "tracked_identifiers": state.limits.tracked_identifiers(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
