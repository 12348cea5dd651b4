use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::{admit, authenticate};
use crate::error::ApiError;
use crate::limits::Action;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{CreatedEvent, NewEvent};
use crate::sanitize::sanitize_event_description;
use crate::state::AppState;

pub async fn create_event_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedEvent>), ApiError> {
    REQUEST_TOTAL.inc();

    // the body is only looked at once the caller is known
    let (token, user) = authenticate(&state, &headers).await?;
    let Json(mut payload) = body?;
    payload.validate(Utc::now())?;
    payload.description = payload
        .description
        .as_deref()
        .map(sanitize_event_description);

    if state.enforce_create_limit {
        admit(&state, Action::Create, &user.id)?;
    }

    let event = state.backend.create_event(&token, &user.id, &payload).await?;

    info!(user_id = %user.id, title = %payload.title, "created event");
    Ok((StatusCode::CREATED, Json(CreatedEvent { event })))
}
