// src/notify/ratelimit.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// `(subscriber_id, channel_id)`.
pub type RateLimitKey = (i64, i64);

/// Cooldown gate preventing notification spam per subscriber/channel pair.
/// - First notification always allowed.
/// - Inside the cooldown window, notifications are suppressed.
/// - State is updated explicitly via `record` right before dispatch.
///
/// State is in-memory only and re-arms from scratch after a restart.
/// Expired entries are pruned so the map stays bounded by the live
/// subscriber×channel working set instead of growing forever.
#[derive(Debug)]
pub struct RateLimiter {
    cooldown: ChronoDuration,
    max_entries: usize,
    last_sent: Mutex<HashMap<RateLimitKey, DateTime<Utc>>>,
}

impl RateLimiter {
    /// `cooldown_secs` < 0 is treated as 0 (no cooldown).
    pub fn new(cooldown_secs: i64, max_entries: usize) -> Self {
        Self {
            cooldown: ChronoDuration::seconds(cooldown_secs.max(0)),
            max_entries,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether `key` is still cooling down at `now`. Does NOT
    /// mutate state.
    pub fn is_limited(&self, key: RateLimitKey, now: DateTime<Utc>) -> bool {
        let last_sent = self.last_sent.lock().expect("rate limit mutex poisoned");
        match last_sent.get(&key) {
            None => false,
            Some(ts) => now.signed_duration_since(*ts) < self.cooldown,
        }
    }

    /// Record a notification for `key` at `now`. When the map outgrows
    /// its soft cap, expired entries are dropped in the same critical
    /// section.
    pub fn record(&self, key: RateLimitKey, now: DateTime<Utc>) {
        let mut last_sent = self.last_sent.lock().expect("rate limit mutex poisoned");
        last_sent.insert(key, now);
        if last_sent.len() > self.max_entries {
            let cooldown = self.cooldown;
            last_sent.retain(|_, ts| now.signed_duration_since(*ts) < cooldown);
        }
    }

    /// Drop entries whose cooldown already elapsed. Returns the number
    /// pruned. Called by the pipeline sweeper.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut last_sent = self.last_sent.lock().expect("rate limit mutex poisoned");
        let before = last_sent.len();
        let cooldown = self.cooldown;
        last_sent.retain(|_, ts| now.signed_duration_since(*ts) < cooldown);
        before - last_sent.len()
    }

    pub fn len(&self) -> usize {
        self.last_sent.lock().expect("rate limit mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
