//! Sliding-window request rate limiter.
//!
//! Used directly by the admission shim (default 100 requests per 60-second
//! window) and reused by the chat service for its own, tighter, per-channel
//! window.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A sliding-window limiter keyed by an arbitrary string (user id, channel
/// key, whatever the caller considers the rate-limited subject).
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    hits: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self { window, max_requests, hits: DashMap::new() }
    }

    /// Records one request for `key` and returns whether it was allowed.
    /// Rejected requests are not counted against future windows.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.hits.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);

        if entry.len() as u32 >= self.max_requests {
            return false;
        }

        entry.push(now);
        true
    }

    /// Number of requests currently counted against `key` in the window.
    pub fn current_count(&self, key: &str) -> u32 {
        let now = Instant::now();
        match self.hits.get(key) {
            Some(entry) => entry.iter().filter(|t| now.duration_since(**t) < self.window).count() as u32,
            None => 0,
        }
    }
}
