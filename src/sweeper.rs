use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use crate::metrics::{SWEPT_TOTAL, TRACKED_IDENTIFIERS};
use crate::state::AppState;

// Expired records are only replaced when their identifier comes back, so
// users who never return would stay in memory without this loop.
pub async fn sweeper(state: Arc<AppState>, sweep_interval: Duration, grace: Duration) {
    let mut interval = interval(sweep_interval);

    info!(interval = ?sweep_interval, grace = ?grace, "rate limit sweeper started");

    loop {
        interval.tick().await;
        sweep_once(&state, grace);
    }
}

pub fn sweep_once(state: &AppState, grace: Duration) -> usize {
    let removed = state.limits.sweep_expired(grace);
    let tracked = state.limits.tracked_identifiers();

    SWEPT_TOTAL.inc_by(removed as u64);
    TRACKED_IDENTIFIERS.set(tracked as i64);

    if removed > 0 {
        debug!(removed, tracked, "swept expired rate limit records");
    }
    removed
}
