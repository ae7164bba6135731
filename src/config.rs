// src/config.rs
use std::time::Duration;

// --- env names & defaults ---
pub const ENV_WORKERS: &str = "SIGNAL_WORKERS";
pub const ENV_QUEUE_CAPACITY: &str = "SIGNAL_QUEUE_CAPACITY";
pub const ENV_DEDUP_TTL_SECS: &str = "SIGNAL_DEDUP_TTL_SECS";
pub const ENV_DEDUP_SWEEP_SECS: &str = "SIGNAL_DEDUP_SWEEP_SECS";
pub const ENV_COOLDOWN_SECS: &str = "NOTIFY_COOLDOWN_SECS";
pub const ENV_RATE_LIMIT_MAX_ENTRIES: &str = "NOTIFY_RATE_LIMIT_MAX_ENTRIES";

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_DEDUP_TTL_SECS: u64 = 600;
pub const DEFAULT_DEDUP_SWEEP_SECS: u64 = 300;
pub const DEFAULT_COOLDOWN_SECS: i64 = 300;
pub const DEFAULT_RATE_LIMIT_MAX_ENTRIES: usize = 10_000;

/// Maximum characters of raw text forwarded on the live feed.
pub const LIVE_PREVIEW_CHARS: usize = 500;

/// Runtime knobs for the pipeline; everything has a sane default so
/// `PipelineConfig::default()` is enough for tests and the demo binary.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of concurrent queue consumers.
    pub workers: usize,
    /// Bounded queue size; producers drop beyond this (backpressure-by-drop).
    pub queue_capacity: usize,
    pub dedup_ttl: Duration,
    pub dedup_sweep_interval: Duration,
    /// Minimum time between two notifications to the same subscriber for
    /// the same source channel.
    pub notification_cooldown_secs: i64,
    /// Soft cap on rate-limit entries before expired ones are pruned.
    pub rate_limit_max_entries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            dedup_ttl: Duration::from_secs(DEFAULT_DEDUP_TTL_SECS),
            dedup_sweep_interval: Duration::from_secs(DEFAULT_DEDUP_SWEEP_SECS),
            notification_cooldown_secs: DEFAULT_COOLDOWN_SECS,
            rate_limit_max_entries: DEFAULT_RATE_LIMIT_MAX_ENTRIES,
        }
    }
}

impl PipelineConfig {
    /// Build from environment variables, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            workers: parse_env(ENV_WORKERS).map_or(d.workers, |v: usize| v.max(1)),
            queue_capacity: parse_env(ENV_QUEUE_CAPACITY)
                .map_or(d.queue_capacity, |v: usize| v.max(1)),
            dedup_ttl: parse_env(ENV_DEDUP_TTL_SECS)
                .map_or(d.dedup_ttl, Duration::from_secs),
            dedup_sweep_interval: parse_env(ENV_DEDUP_SWEEP_SECS)
                .map_or(d.dedup_sweep_interval, Duration::from_secs),
            notification_cooldown_secs: parse_env(ENV_COOLDOWN_SECS)
                .map_or(d.notification_cooldown_secs, |v: i64| v.max(0)),
            rate_limit_max_entries: parse_env(ENV_RATE_LIMIT_MAX_ENTRIES)
                .unwrap_or(d.rate_limit_max_entries),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
