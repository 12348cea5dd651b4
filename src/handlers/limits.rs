use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use super::authenticate;
use crate::error::ApiError;
use crate::limits::Action;
use crate::models::LimitsResponse;
use crate::state::AppState;

// Caller's remaining quota, read-only
pub async fn limits_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LimitsResponse>, ApiError> {
    let (_, user) = authenticate(&state, &headers).await?;

    let limits = [Action::Join, Action::Create]
        .into_iter()
        .map(|action| state.limits.quota(action, &user.id))
        .collect();

    Ok(Json(LimitsResponse {
        user_id: user.id,
        limits,
    }))
}
