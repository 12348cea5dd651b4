use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to. Used by tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_ms(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// Policy bound to a limiter for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn window_ms(&self) -> i64 {
        duration_ms(self.window)
    }
}

// Rate limit record - tracks admissions per identifier in the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_reset_at: i64, // ms since epoch
}

impl RateLimitRecord {
    fn fresh(now: i64, window_ms: i64) -> Self {
        Self {
            count: 1,
            window_reset_at: now.saturating_add(window_ms),
        }
    }

    fn is_live(&self, now: i64) -> bool {
        self.window_reset_at > now
    }
}

/// Fixed-window admission controller.
///
/// Each identifier gets `max_requests` admissions per window. The window
/// starts at the first admission and the count is discarded once
/// `window_reset_at` is reached. Two windows back to back can therefore
/// admit up to twice the ceiling around the boundary.
///
/// Checks for one identifier are serialised by the store's shard lock, so the
/// ceiling holds with any number of concurrent callers.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: DashMap<String, RateLimitRecord>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store: DashMap::new(),
            clock,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Admit or reject one request for `identifier`. Rejections leave the
    /// record untouched.
    pub fn is_allowed(&self, identifier: &str) -> bool {
        let now = self.clock.now_ms();
        let window_ms = self.config.window_ms();

        // the entry guard holds the shard write lock until we return
        match self.store.entry(identifier.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(RateLimitRecord::fresh(now, window_ms));
                true
            }
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();

                // window expired..? start a new one
                if !record.is_live(now) {
                    *record = RateLimitRecord::fresh(now, window_ms);
                    return true;
                }

                if record.count >= self.config.max_requests {
                    return false;
                }

                record.count += 1;
                true
            }
        }
    }

    pub fn remaining_requests(&self, identifier: &str) -> u32 {
        match self.live_record(identifier) {
            Some(record) => self.config.max_requests.saturating_sub(record.count),
            None => self.config.max_requests,
        }
    }

    /// Reset timestamp of the live window in ms since epoch, or 0 if there is none.
    pub fn reset_time(&self, identifier: &str) -> i64 {
        self.live_record(identifier)
            .map(|record| record.window_reset_at)
            .unwrap_or(0)
    }

    /// Milliseconds until the live window for `identifier` ends, 0 if none is open.
    pub fn wait_ms(&self, identifier: &str) -> i64 {
        let now = self.clock.now_ms();
        self.store
            .get(identifier)
            .map(|record| (record.window_reset_at - now).max(0))
            .unwrap_or(0)
    }

    /// Drop records whose window ended at least `grace` ago. Returns how many
    /// were removed.
    pub fn sweep_expired(&self, grace: Duration) -> usize {
        let now = self.clock.now_ms();
        let grace_ms = duration_ms(grace);
        let mut removed = 0;

        self.store.retain(|_, record| {
            let keep = record.window_reset_at.saturating_add(grace_ms) > now;
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn live_record(&self, identifier: &str) -> Option<RateLimitRecord> {
        let now = self.clock.now_ms();
        self.store
            .get(identifier)
            .map(|record| *record)
            .filter(|record| record.is_live(now))
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
