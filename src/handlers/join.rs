use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    http::HeaderMap,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::{admit, authenticate};
use crate::error::ApiError;
use crate::limits::Action;
use crate::metrics::REQUEST_TOTAL;
use crate::models::SuccessResponse;
use crate::state::AppState;

pub async fn join_handler(
    State(state): State<Arc<AppState>>,
    event_id: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    let (token, user) = authenticate(&state, &headers).await?;
    let Path(event_id) = event_id?;

    let event = state
        .backend
        .fetch_event(&token, &event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    if let Some(reason) = event.join_blocker(Utc::now()) {
        return Err(ApiError::BadRequest(reason.into()));
    }

    admit(&state, Action::Join, &user.id)?;

    if state.backend.is_participant(&token, &event_id, &user.id).await? {
        return Err(ApiError::BadRequest("Already joined this event".into()));
    }

    state
        .backend
        .insert_participant(&token, &event_id, &user.id)
        .await?;

    info!(event_id = %event_id, user_id = %user.id, "joined event");
    Ok(Json(SuccessResponse { success: true }))
}

// Leaving is never limited and does not hand quota back
pub async fn leave_handler(
    State(state): State<Arc<AppState>>,
    event_id: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    let (token, user) = authenticate(&state, &headers).await?;
    let Path(event_id) = event_id?;

    state
        .backend
        .delete_participant(&token, &event_id, &user.id)
        .await?;

    info!(event_id = %event_id, user_id = %user.id, "left event");
    Ok(Json(SuccessResponse { success: true }))
}
