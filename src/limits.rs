use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::metrics::{ADMITTED_TOTAL, REJECTED_TOTAL};
use crate::rate_limit::{Clock, RateLimitConfig, RateLimiter, SystemClock};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

// Guarded actions. Each one owns its own limiter and key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Join,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Join => "join",
        }
    }

    // "join:<user-id>"
    pub fn key(self, user_id: &str) -> String {
        format!("{}:{}", self.label(), user_id)
    }

    fn noun(self) -> &'static str {
        match self {
            Action::Create => "creation",
            Action::Join => "join",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quota {
    pub action: Action,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64, // 0 when no window is open
}

/// The per-user event quotas: one limiter for creating events, one for joining them.
pub struct EventLimits {
    creation: RateLimiter,
    join: RateLimiter,
}

impl Default for EventLimits {
    fn default() -> Self {
        Self::new(
            RateLimitConfig::new(3, DAY),
            RateLimitConfig::new(3, DAY),
        )
    }
}

impl EventLimits {
    pub fn new(creation: RateLimitConfig, join: RateLimitConfig) -> Self {
        Self::with_clock(creation, join, Arc::new(SystemClock))
    }

    pub fn with_clock(creation: RateLimitConfig, join: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            creation: RateLimiter::with_clock(creation, clock.clone()),
            join: RateLimiter::with_clock(join, clock),
        }
    }

    pub fn limiter(&self, action: Action) -> &RateLimiter {
        match action {
            Action::Create => &self.creation,
            Action::Join => &self.join,
        }
    }

    pub fn check(&self, action: Action, user_id: &str) -> bool {
        let allowed = self.limiter(action).is_allowed(&action.key(user_id));

        if allowed {
            ADMITTED_TOTAL.with_label_values(&[action.label()]).inc();
            debug!(%action, user_id, "admitted");
        } else {
            REJECTED_TOTAL.with_label_values(&[action.label()]).inc();
            warn!(%action, user_id, "rate limit reached");
        }
        allowed
    }

    pub fn remaining(&self, action: Action, user_id: &str) -> u32 {
        self.limiter(action).remaining_requests(&action.key(user_id))
    }

    pub fn reset_time(&self, action: Action, user_id: &str) -> i64 {
        self.limiter(action).reset_time(&action.key(user_id))
    }

    // Whole seconds until the caller's window ends, at least 1
    pub fn retry_after_secs(&self, action: Action, user_id: &str) -> u64 {
        let wait_ms = self.limiter(action).wait_ms(&action.key(user_id)) as u64;
        wait_ms.div_ceil(1000).max(1)
    }

    pub fn quota(&self, action: Action, user_id: &str) -> Quota {
        Quota {
            action,
            limit: self.limiter(action).config().max_requests,
            remaining: self.remaining(action, user_id),
            reset_at: self.reset_time(action, user_id),
        }
    }

    // Message shown to the user when `check` says no
    pub fn denial_message(&self, action: Action) -> String {
        let config = self.limiter(action).config();
        if config.window == DAY {
            return format!(
                "Daily event {} limit reached ({} events per day)",
                action.noun(),
                config.max_requests
            );
        }
        format!(
            "Event {} limit reached ({} events per {})",
            action.noun(),
            config.max_requests,
            describe_window(config.window)
        )
    }

    pub fn tracked_identifiers(&self) -> usize {
        self.creation.len() + self.join.len()
    }

    pub fn sweep_expired(&self, grace: Duration) -> usize {
        self.creation.sweep_expired(grace) + self.join.sweep_expired(grace)
    }
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    let (amount, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if amount == 1 {
        unit.to_string()
    } else {
        format!("{} {}s", amount, unit)
    }
}
