// src/pipeline/dedup.rs
//! # Deduplication Cache
//! Maps a message identity `(channel_id, message_id)` to its extraction
//! result and persistence state, so a message arriving through several
//! user accounts is extracted and stored once.
//!
//! One mutex guards the whole map. The critical section covers lookup AND
//! insertion (the extraction closure runs under the lock on first sight),
//! so two workers can never extract the same key independently. Extraction
//! is pure and synchronous; the lock is never held across an await.
//!
//! The persist side-effect is exactly-once: a worker must win
//! [`DedupCache::begin_persist`] before calling storage, and either
//! confirms with `mark_persisted` or backs out with `release_persist` so a
//! later duplicate retries a failed save.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::types::Detection;

/// The pair identifying a message uniquely within one source channel.
pub type DedupKey = (i64, i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PersistState {
    Unpersisted,
    InFlight,
    Persisted,
}

#[derive(Debug, Clone)]
struct Entry {
    detection: Option<Detection>,
    persist: PersistState,
    first_seen: DateTime<Utc>,
}

/// Cached outcome for one key, as seen by a worker.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub detection: Option<Detection>,
    pub persisted: bool,
}

/// Thread-safe dedup map with time-based expiry.
#[derive(Debug, Default)]
pub struct DedupCache {
    entries: Mutex<HashMap<DedupKey, Entry>>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`; on first sight run `extract` and store its
    /// (possibly-null) result under the same critical section. Returns the
    /// cached result and whether the key was newly created.
    pub fn lookup_or_create<F>(
        &self,
        key: DedupKey,
        now: DateTime<Utc>,
        extract: F,
    ) -> (CachedResult, bool)
    where
        F: FnOnce() -> Option<Detection>,
    {
        let mut entries = self.entries.lock().expect("dedup mutex poisoned");
        if let Some(entry) = entries.get(&key) {
            return (
                CachedResult {
                    detection: entry.detection.clone(),
                    persisted: entry.persist == PersistState::Persisted,
                },
                false,
            );
        }

        let detection = extract();
        entries.insert(
            key,
            Entry {
                detection: detection.clone(),
                persist: PersistState::Unpersisted,
                first_seen: now,
            },
        );
        (
            CachedResult {
                detection,
                persisted: false,
            },
            true,
        )
    }

    /// Claim the persist side-effect for `key`. Exactly one caller wins
    /// until the claim is resolved via `mark_persisted` (success) or
    /// `release_persist` (failure). Returns false for already-claimed,
    /// already-persisted or swept keys.
    pub fn begin_persist(&self, key: DedupKey) -> bool {
        let mut entries = self.entries.lock().expect("dedup mutex poisoned");
        match entries.get_mut(&key) {
            Some(entry) if entry.persist == PersistState::Unpersisted => {
                entry.persist = PersistState::InFlight;
                true
            }
            _ => false,
        }
    }

    /// Flip the entry to persisted after a successful durable store.
    /// Idempotent; a no-op for keys the sweep already removed.
    pub fn mark_persisted(&self, key: DedupKey) {
        let mut entries = self.entries.lock().expect("dedup mutex poisoned");
        if let Some(entry) = entries.get_mut(&key) {
            entry.persist = PersistState::Persisted;
        }
    }

    /// Back out of a failed save so a later duplicate retries it.
    pub fn release_persist(&self, key: DedupKey) {
        let mut entries = self.entries.lock().expect("dedup mutex poisoned");
        if let Some(entry) = entries.get_mut(&key) {
            if entry.persist == PersistState::InFlight {
                entry.persist = PersistState::Unpersisted;
            }
        }
    }

    /// Remove entries first seen longer than `ttl` ago. Returns the number
    /// of entries pruned. A very late duplicate arriving after its entry
    /// expired will be re-processed; accepted.
    pub fn sweep(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX);
        let mut entries = self.entries.lock().expect("dedup mutex poisoned");
        let before = entries.len();
        entries.retain(|_, e| now.signed_duration_since(e.first_seen) <= ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("dedup mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn extraction_runs_once_per_key() {
        let cache = DedupCache::new();
        let mut calls = 0;

        let (first, is_new) = cache.lookup_or_create((1, 10), t0(), || {
            calls += 1;
            parser::parse_message("$BTC entry: $45000", "Alpha")
        });
        assert!(is_new);
        assert!(first.detection.is_some());

        let (second, is_new) = cache.lookup_or_create((1, 10), t0(), || {
            calls += 1;
            None
        });
        assert!(!is_new);
        assert_eq!(second.detection, first.detection);
        assert_eq!(calls, 1);
    }

    #[test]
    fn null_results_are_cached_too() {
        let cache = DedupCache::new();
        let (res, is_new) = cache.lookup_or_create((1, 11), t0(), || None);
        assert!(is_new);
        assert!(res.detection.is_none());

        let (res, is_new) = cache.lookup_or_create((1, 11), t0(), || {
            panic!("must not re-extract a cached key")
        });
        assert!(!is_new);
        assert!(res.detection.is_none());
    }

    #[test]
    fn persist_claim_goes_to_exactly_one_caller() {
        let cache = DedupCache::new();
        cache.lookup_or_create((2, 20), t0(), || None);

        assert!(cache.begin_persist((2, 20)));
        assert!(!cache.begin_persist((2, 20)), "claim is exclusive");

        cache.mark_persisted((2, 20));
        assert!(!cache.begin_persist((2, 20)), "persisted keys stay closed");

        let (res, _) = cache.lookup_or_create((2, 20), t0(), || None);
        assert!(res.persisted);
    }

    #[test]
    fn released_claim_can_be_retried() {
        let cache = DedupCache::new();
        cache.lookup_or_create((3, 30), t0(), || None);

        assert!(cache.begin_persist((3, 30)));
        cache.release_persist((3, 30)); // save failed
        assert!(cache.begin_persist((3, 30)), "a later duplicate retries");
    }

    #[test]
    fn claims_on_unknown_keys_are_refused() {
        let cache = DedupCache::new();
        assert!(!cache.begin_persist((9, 99)));
        cache.mark_persisted((9, 99)); // no-op
        cache.release_persist((9, 99)); // no-op
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let cache = DedupCache::new();
        cache.lookup_or_create((1, 1), t0(), || None);
        cache.lookup_or_create((1, 2), t0() + ChronoDuration::seconds(500), || None);

        let now = t0() + ChronoDuration::seconds(601);
        let pruned = cache.sweep(now, Duration::from_secs(600));
        assert_eq!(pruned, 1);
        assert_eq!(cache.len(), 1);

        // the expired key is processed from scratch
        let (_, is_new) = cache.lookup_or_create((1, 1), now, || None);
        assert!(is_new);
    }
}
