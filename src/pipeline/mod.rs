// src/pipeline/mod.rs
//! # Ingestion Pipeline
//! One owned context object wiring the bounded ingestion queue, the
//! worker pool, the dedup cache and the notification dispatcher.
//! Constructed once at startup and handed to producers as cheap
//! [`SourceHandle`]s — no global singletons.
//!
//! ```text
//!   source A handle ─→ push ─┐
//!   source B handle ─→ push ─┤   bounded mpsc queue
//!   source C handle ─→ push ─┘          │
//!                 ┌────────────────────┼──────────────┐
//!                 │ worker 1 … worker N (+ TTL sweep) │
//!                 │ dedup → extract → save → notify   │
//!                 └───────────────────────────────────┘
//! ```

pub mod dedup;
pub mod sources;
mod worker;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::notify::Dispatcher;
use crate::ports::{
    ChatEcho, EmailSender, NotificationStore, RealtimePush, SignalStore, SubscriptionDirectory,
};
use crate::types::RawMessage;
use self::dedup::DedupCache;
use self::sources::{SourceHandle, SourceRegistry, SourceStatsSnapshot};
use self::worker::{SharedReceiver, WorkerContext};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("signal_messages_total", "Messages consumed from the queue.");
        describe_counter!("signal_detections_total", "Valid detections (pre-persist).");
        describe_counter!(
            "signal_dedup_hits_total",
            "Messages answered from the dedup cache."
        );
        describe_counter!(
            "signal_queue_dropped_total",
            "Messages dropped because the queue was full."
        );
        describe_counter!(
            "signal_dedup_pruned_total",
            "Dedup entries removed by the TTL sweep."
        );
        describe_gauge!("signal_queue_depth", "Messages currently queued.");
    });
}

/// External collaborators the pipeline core talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn SignalStore>,
    pub directory: Arc<dyn SubscriptionDirectory>,
    pub push: Arc<dyn RealtimePush>,
    pub email: Arc<dyn EmailSender>,
    pub notifications: Arc<dyn NotificationStore>,
    pub echo: Arc<dyn ChatEcho>,
}

/// Point-in-time observability snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub workers: usize,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub dropped: u64,
    pub dedup_entries: usize,
    pub rate_limit_entries: usize,
    pub connected_sources: usize,
}

pub struct Pipeline {
    cfg: PipelineConfig,
    tx: mpsc::Sender<RawMessage>,
    rx: SharedReceiver,
    dropped: Arc<AtomicU64>,
    dedup: Arc<DedupCache>,
    registry: Arc<SourceRegistry>,
    dispatcher: Arc<Dispatcher>,
    ctx: Arc<WorkerContext>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl Pipeline {
    pub fn new(cfg: PipelineConfig, collaborators: Collaborators) -> Self {
        ensure_metrics_described();

        let (tx, rx) = mpsc::channel(cfg.queue_capacity);
        let dedup = Arc::new(DedupCache::new());
        let registry = Arc::new(SourceRegistry::default());
        let dispatcher = Arc::new(Dispatcher::new(
            collaborators.directory,
            collaborators.notifications,
            collaborators.push.clone(),
            collaborators.email,
            collaborators.echo,
            cfg.notification_cooldown_secs,
            cfg.rate_limit_max_entries,
        ));
        let ctx = Arc::new(WorkerContext {
            dedup: dedup.clone(),
            sources: registry.clone(),
            store: collaborators.store,
            push: collaborators.push,
            dispatcher: dispatcher.clone(),
        });

        Self {
            cfg,
            tx,
            rx: Arc::new(Mutex::new(rx)),
            dropped: Arc::new(AtomicU64::new(0)),
            dedup,
            registry,
            dispatcher,
            ctx,
            tasks: StdMutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the worker pool and the TTL sweeper. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut tasks = self.tasks.lock().expect("task list mutex poisoned");
        for worker_id in 0..self.cfg.workers {
            tasks.push(tokio::spawn(worker::run(
                worker_id,
                self.rx.clone(),
                self.ctx.clone(),
            )));
        }
        tasks.push(self.spawn_sweeper());
        tracing::info!(workers = self.cfg.workers, "started message-processing workers");
    }

    fn spawn_sweeper(&self) -> JoinHandle<()> {
        let dedup = self.dedup.clone();
        let dispatcher = self.dispatcher.clone();
        let ttl = self.cfg.dedup_ttl;
        let interval = self.cfg.dedup_sweep_interval;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the immediate first tick would sweep an empty cache
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let now = Utc::now();
                let pruned = dedup.sweep(now, ttl);
                let stale_limits = dispatcher.limiter().prune(now);
                counter!("signal_dedup_pruned_total").increment(pruned as u64);
                gauge!("signal_queue_depth")
                    .set((tx.max_capacity() - tx.capacity()) as f64);
                if pruned > 0 || stale_limits > 0 {
                    tracing::debug!(pruned, stale_limits, "cache sweep");
                }
            }
        })
    }

    /// Register a source and hand back the push handle its adapter keeps.
    pub fn register_source(&self, source_user_id: i64) -> SourceHandle {
        self.registry.register(source_user_id);
        tracing::info!(source_user_id, "source registered");
        SourceHandle {
            source_user_id,
            tx: self.tx.clone(),
            dropped: self.dropped.clone(),
        }
    }

    /// Forget a disconnected source. Queued items from it still process;
    /// only the counters stop being tracked. Workers keep running for
    /// other sources.
    pub fn remove_source(&self, source_user_id: i64) {
        self.registry.remove(source_user_id);
        tracing::info!(source_user_id, "source removed");
    }

    pub fn source_status(&self, source_user_id: i64) -> Option<SourceStatsSnapshot> {
        self.registry.get(source_user_id).map(|s| s.snapshot())
    }

    /// Direct access for callers that dispatch outside the worker path.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            workers: self.cfg.workers,
            queue_depth: self.tx.max_capacity() - self.tx.capacity(),
            queue_capacity: self.tx.max_capacity(),
            dropped: self.dropped.load(Ordering::Relaxed),
            dedup_entries: self.dedup.len(),
            rate_limit_entries: self.dispatcher.limiter().len(),
            connected_sources: self.registry.len(),
        }
    }

    /// Abort workers and sweeper; in-flight queue items are dropped.
    /// Source handles held by adapters turn into no-ops once the last
    /// receiver is gone.
    pub async fn shutdown(&self) {
        let tasks: Vec<JoinHandle<()>> = {
            let mut guard = self.tasks.lock().expect("task list mutex poisoned");
            guard.drain(..).collect()
        };
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }
        self.started.store(false, Ordering::SeqCst);
        tracing::info!("pipeline shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{InAppNotification, SignalContext};
    use crate::types::{Detection, Subscription};
    use anyhow::Result;
    use serde_json::Value;

    struct NullPorts;

    #[async_trait::async_trait]
    impl SignalStore for NullPorts {
        async fn save(&self, _d: &Detection, _c: &SignalContext) -> Result<i64> {
            Ok(1)
        }
    }
    #[async_trait::async_trait]
    impl SubscriptionDirectory for NullPorts {
        async fn active_subscriptions(&self, _channel_id: i64) -> Result<Vec<Subscription>> {
            Ok(Vec::new())
        }
    }
    #[async_trait::async_trait]
    impl RealtimePush for NullPorts {
        async fn send_to_subscriber(&self, _id: i64, _payload: Value) -> Result<()> {
            Ok(())
        }
    }
    #[async_trait::async_trait]
    impl EmailSender for NullPorts {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
            Ok(())
        }
    }
    #[async_trait::async_trait]
    impl NotificationStore for NullPorts {
        async fn create(&self, _id: i64, _n: &InAppNotification) -> Result<i64> {
            Ok(1)
        }
    }
    #[async_trait::async_trait]
    impl ChatEcho for NullPorts {
        async fn send_to_self(&self, _id: i64, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    fn null_collaborators() -> Collaborators {
        let ports = Arc::new(NullPorts);
        Collaborators {
            store: ports.clone(),
            directory: ports.clone(),
            push: ports.clone(),
            email: ports.clone(),
            notifications: ports.clone(),
            echo: ports,
        }
    }

    fn raw(message_id: i64) -> RawMessage {
        RawMessage {
            source_user_id: 7,
            channel_id: 42,
            channel_name: "Alpha".into(),
            message_id,
            text: "hello there".into(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn queue_depth_reflects_unconsumed_items() {
        let pipeline = Pipeline::new(PipelineConfig::default(), null_collaborators());
        let handle = pipeline.register_source(7);
        handle.push(raw(1));
        handle.push(raw(2));

        let status = pipeline.status();
        assert_eq!(status.queue_depth, 2);
        assert_eq!(status.connected_sources, 1);
        assert_eq!(status.dropped, 0);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_shutdown_aborts() {
        let pipeline = Pipeline::new(PipelineConfig::default(), null_collaborators());
        pipeline.start();
        pipeline.start();
        {
            let tasks = pipeline.tasks.lock().unwrap();
            assert_eq!(tasks.len(), pipeline.cfg.workers + 1); // + sweeper
        }
        pipeline.shutdown().await;
        assert!(pipeline.tasks.lock().unwrap().is_empty());
    }
}
