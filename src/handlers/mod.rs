mod events;
mod health;
mod join;
mod limits;
mod metrics;

pub use events::create_event_handler;
pub use health::health_handler;
pub use join::{join_handler, leave_handler};
pub use limits::limits_handler;
pub use metrics::metrics_handler;

use axum::http::{HeaderMap, header};

use crate::error::ApiError;
use crate::limits::Action;
use crate::models::AuthUser;
use crate::state::AppState;

// Resolve the caller through the backend's auth service
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<(String, AuthUser), ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let user = state.backend.current_user(token).await?;
    Ok((token.to_string(), user))
}

// Rate limit gate in front of a state-changing action
fn admit(state: &AppState, action: Action, user_id: &str) -> Result<(), ApiError> {
    if state.limits.check(action, user_id) {
        return Ok(());
    }

    Err(ApiError::RateLimited {
        message: state.limits.denial_message(action),
        retry_after: state.limits.retry_after_secs(action, user_id),
    })
}
