//! Fixed-window request throttling, keyed by caller.
//!
//! Windows are aligned to the epoch: all callers share window boundaries at
//! multiples of `window_secs`, and a caller's counter resets when the window
//! rolls over. Fixed-window was chosen over token-bucket for its trivially
//! explainable `X-RateLimit-Reset` semantics; the choice is process-local
//! policy, not part of the statistics engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Clock seam so tests can drive the window deterministically.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicU64,
}

impl ManualClock {
    pub fn at(now: u64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(now),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Snapshot of a caller's budget, mirrored into `X-RateLimit-*` headers on
/// every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_unix: u64,
}

impl RateLimitDecision {
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_unix.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    window_id: u64,
    count: u32,
}

pub struct RateLimiter {
    limit: u32,
    window_secs: u64,
    clock: Arc<dyn Clock>,
    counters: Mutex<HashMap<String, WindowCounter>>,
}

pub const DEFAULT_LIMIT: u32 = 30;
pub const DEFAULT_WINDOW_SECS: u64 = 60;

impl RateLimiter {
    pub fn new(limit: u32, window_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit: limit.max(1),
            window_secs: window_secs.max(1),
            clock,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Policy from `DRAWLAB_RATE_LIMIT` / `DRAWLAB_RATE_WINDOW_SECS` with the
    /// system clock.
    pub fn from_env() -> Self {
        let limit = env_u64("DRAWLAB_RATE_LIMIT").unwrap_or(u64::from(DEFAULT_LIMIT)) as u32;
        let window_secs = env_u64("DRAWLAB_RATE_WINDOW_SECS").unwrap_or(DEFAULT_WINDOW_SECS);
        Self::new(limit, window_secs, Arc::new(SystemClock))
    }

    /// Count one request against `caller` and decide whether to admit it.
    pub fn check(&self, caller: &str) -> RateLimitDecision {
        let now = self.clock.now_unix();
        let window_id = now / self.window_secs;
        let reset_unix = (window_id + 1) * self.window_secs;

        let mut counters = self.counters.lock().expect("rate limiter mutex");
        counters.retain(|_, counter| counter.window_id >= window_id);

        let counter = counters
            .entry(caller.to_string())
            .or_insert(WindowCounter { window_id, count: 0 });
        if counter.window_id != window_id {
            counter.window_id = window_id;
            counter.count = 0;
        }

        if counter.count >= self.limit {
            return RateLimitDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_unix,
            };
        }

        counter.count += 1;
        RateLimitDecision {
            allowed: true,
            limit: self.limit,
            remaining: self.limit - counter.count,
            reset_unix,
        }
    }

    /// Current budget without consuming a request. Used for responses that
    /// carry the headers but are not themselves throttled.
    pub fn peek(&self, caller: &str) -> RateLimitDecision {
        let now = self.clock.now_unix();
        let window_id = now / self.window_secs;
        let reset_unix = (window_id + 1) * self.window_secs;

        let counters = self.counters.lock().expect("rate limiter mutex");
        let count = counters
            .get(caller)
            .filter(|counter| counter.window_id == window_id)
            .map_or(0, |counter| counter.count);

        RateLimitDecision {
            allowed: count < self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
            reset_unix,
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}
