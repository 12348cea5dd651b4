pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limits;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod sanitize;
pub mod state;
pub mod sweeper;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::handlers::{
    create_event_handler, health_handler, join_handler, leave_handler, limits_handler,
    metrics_handler,
};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/events", post(create_event_handler))
        .route("/api/events/{id}/join", post(join_handler).delete(leave_handler))
        .route("/api/me/limits", get(limits_handler))
        .with_state(state)
}
