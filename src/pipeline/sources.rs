// src/pipeline/sources.rs
//! Source adapter glue: a cheap clonable handle per connected account for
//! pushing raw messages into the shared ingestion queue, plus per-source
//! progress counters.

use chrono::{DateTime, TimeZone, Utc};
use metrics::counter;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::types::RawMessage;

/// Outcome of a non-blocking enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    /// Queue full (or pipeline shut down); message discarded, producer
    /// never blocked.
    Dropped,
}

/// Progress counters for one connected source. Updated with relaxed
/// atomics by whichever worker processes that source's message, so
/// snapshots are approximate under concurrent load.
#[derive(Debug, Default)]
pub struct SourceStats {
    messages_processed: AtomicU64,
    signals_detected: AtomicU64,
    /// Unix seconds of the last processed message; 0 = never.
    last_message_at: AtomicI64,
}

impl SourceStats {
    pub(crate) fn record_message(&self, now: DateTime<Utc>) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.last_message_at.store(now.timestamp(), Ordering::Relaxed);
    }

    pub(crate) fn record_signal(&self) {
        self.signals_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SourceStatsSnapshot {
        let ts = self.last_message_at.load(Ordering::Relaxed);
        SourceStatsSnapshot {
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            signals_detected: self.signals_detected.load(Ordering::Relaxed),
            last_message_at: (ts > 0).then(|| Utc.timestamp_opt(ts, 0).unwrap()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceStatsSnapshot {
    pub messages_processed: u64,
    pub signals_detected: u64,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Registry of connected sources and their counters.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    inner: Mutex<HashMap<i64, Arc<SourceStats>>>,
}

impl SourceRegistry {
    /// Get-or-create the stats slot for a source.
    pub fn register(&self, source_user_id: i64) -> Arc<SourceStats> {
        let mut inner = self.inner.lock().expect("source registry mutex poisoned");
        inner.entry(source_user_id).or_default().clone()
    }

    /// Forget a disconnected source. Its in-flight queue items still
    /// process; the counters just stop being reported.
    pub fn remove(&self, source_user_id: i64) {
        self.inner
            .lock()
            .expect("source registry mutex poisoned")
            .remove(&source_user_id);
    }

    pub fn get(&self, source_user_id: i64) -> Option<Arc<SourceStats>> {
        self.inner
            .lock()
            .expect("source registry mutex poisoned")
            .get(&source_user_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("source registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle a source adapter holds onto. `push` is called from the
/// adapter's own event callback: it must return immediately and must
/// never fail upward.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    pub(crate) source_user_id: i64,
    pub(crate) tx: mpsc::Sender<RawMessage>,
    pub(crate) dropped: Arc<AtomicU64>,
}

impl SourceHandle {
    /// Non-blocking enqueue with backpressure-by-drop: a full queue (or a
    /// stopped pipeline) discards the message and bumps the drop counter.
    pub fn push(&self, message: RawMessage) -> EnqueueOutcome {
        match self.tx.try_send(message) {
            Ok(()) => EnqueueOutcome::Enqueued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                counter!("signal_queue_dropped_total").increment(1);
                EnqueueOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    source_user_id = self.source_user_id,
                    "ingestion queue closed; dropping message"
                );
                self.dropped.fetch_add(1, Ordering::Relaxed);
                EnqueueOutcome::Dropped
            }
        }
    }

    pub fn source_user_id(&self) -> i64 {
        self.source_user_id
    }

    /// Messages dropped across the whole pipeline (the counter is shared
    /// by all handles).
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_returns_same_slot_per_source() {
        let reg = SourceRegistry::default();
        let a = reg.register(7);
        let b = reg.register(7);
        a.record_signal();
        assert_eq!(b.snapshot().signals_detected, 1);
        assert_eq!(reg.len(), 1);

        reg.remove(7);
        assert!(reg.get(7).is_none());
    }

    #[test]
    fn snapshot_reports_last_message_time() {
        let stats = SourceStats::default();
        assert_eq!(stats.snapshot().last_message_at, None);
        let now = Utc::now();
        stats.record_message(now);
        let snap = stats.snapshot();
        assert_eq!(snap.messages_processed, 1);
        assert_eq!(snap.last_message_at.unwrap().timestamp(), now.timestamp());
    }
}
