// src/pipeline/worker.rs
//! Queue consumers. Each worker drains the shared ingestion queue and runs
//! the per-message sequence: counters → dedup/extraction → persistence →
//! notification dispatch → live-feed push.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::config::LIVE_PREVIEW_CHARS;
use crate::notify::Dispatcher;
use crate::parser;
use crate::pipeline::dedup::DedupCache;
use crate::pipeline::sources::SourceRegistry;
use crate::ports::{RealtimePush, SignalContext, SignalStore};
use crate::types::{Detection, RawMessage};

/// Everything a worker touches, shared across the pool.
pub(crate) struct WorkerContext {
    pub dedup: Arc<DedupCache>,
    pub sources: Arc<SourceRegistry>,
    pub store: Arc<dyn SignalStore>,
    pub push: Arc<dyn RealtimePush>,
    pub dispatcher: Arc<Dispatcher>,
}

pub(crate) type SharedReceiver = Arc<Mutex<mpsc::Receiver<RawMessage>>>;

/// Worker loop: runs until the queue is closed and drained. Each item is
/// processed in its own task so a panic in one message cannot take the
/// worker down.
pub(crate) async fn run(worker_id: usize, rx: SharedReceiver, ctx: Arc<WorkerContext>) {
    loop {
        let item = { rx.lock().await.recv().await };
        let Some(message) = item else {
            tracing::debug!(worker_id, "ingestion queue closed; worker exiting");
            break;
        };

        let channel_id = message.channel_id;
        let message_id = message.message_id;
        let task = tokio::spawn(process_message(ctx.clone(), message));
        if let Err(e) = task.await {
            tracing::error!(
                worker_id,
                channel_id,
                message_id,
                error = ?e,
                "message processing failed"
            );
        }
    }
}

/// Process one queued message end to end. Collaborator failures are
/// tolerated per call site; nothing here stops the worker loop.
async fn process_message(ctx: Arc<WorkerContext>, message: RawMessage) {
    let now = Utc::now();
    let stats = ctx.sources.register(message.source_user_id);
    stats.record_message(now);
    counter!("signal_messages_total").increment(1);

    let key = (message.channel_id, message.message_id);
    let (cached, is_new) = ctx
        .dedup
        .lookup_or_create(key, now, || {
            parser::parse_message(&message.text, &message.channel_name)
        });
    if !is_new {
        counter!("signal_dedup_hits_total").increment(1);
    }

    let detection = cached.detection.as_ref().filter(|d| d.is_valid());

    if let Some(detection) = detection {
        // Persist exactly once per unique message: the claim keeps two
        // workers holding the same key from both calling storage, and a
        // failed save releases it so a later duplicate retries.
        if !cached.persisted && ctx.dedup.begin_persist(key) {
            stats.record_signal();
            counter!("signal_detections_total").increment(1);

            let sig_ctx = SignalContext {
                channel_id: message.channel_id,
                message_id: message.message_id,
                source_user_id: message.source_user_id,
            };
            match ctx.store.save(detection, &sig_ctx).await {
                Ok(record_id) => {
                    ctx.dedup.mark_persisted(key);
                    tracing::info!(
                        record_id,
                        signal_type = detection.signal_type.as_str(),
                        token = detection.token_symbol.as_deref().unwrap_or("?"),
                        channel = %message.channel_name,
                        "saved signal"
                    );
                }
                Err(e) => {
                    ctx.dedup.release_persist(key);
                    tracing::error!(
                        channel_id = message.channel_id,
                        message_id = message.message_id,
                        error = ?e,
                        "failed to save signal; a duplicate arrival will retry"
                    );
                }
            }
        }

        let report = ctx.dispatcher.dispatch(message.channel_id, detection).await;
        if !report.errors.is_empty() {
            tracing::warn!(
                channel_id = message.channel_id,
                errors = ?report.errors,
                "dispatch finished with delivery errors"
            );
        }
    }

    // Live feed for the owning source user: always, detection or not.
    let payload = live_event(&message, detection, now);
    if let Err(e) = ctx
        .push
        .send_to_subscriber(message.source_user_id, payload)
        .await
    {
        tracing::debug!(
            subscriber_id = message.source_user_id,
            error = ?e,
            "live feed push failed"
        );
    }
}

/// Lightweight live-activity event, distinct from a notification.
fn live_event(message: &RawMessage, detection: Option<&Detection>, now: DateTime<Utc>) -> Value {
    let preview: String = message.text.chars().take(LIVE_PREVIEW_CHARS).collect();
    json!({
        "type": "channel_message",
        "data": {
            "channel_name": message.channel_name,
            "channel_id": message.channel_id,
            "text": preview,
            "message_id": message.message_id,
            "timestamp": message.received_at,
            "has_signal": detection.is_some(),
            "signal_type": detection.map(|d| d.signal_type),
            "token_symbol": detection.and_then(|d| d.token_symbol.clone()),
            "contract_addresses": detection.map(|d| d.contract_addresses.clone()).unwrap_or_default(),
            "chain": detection.and_then(|d| d.chain.clone()),
            "sentiment": detection.map(|d| d.sentiment),
        },
        "timestamp": now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> RawMessage {
        RawMessage {
            source_user_id: 7,
            channel_id: 42,
            channel_name: "Alpha".into(),
            message_id: 1,
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn live_event_without_detection_is_flagged_false() {
        let ev = live_event(&raw("just chatting"), None, Utc::now());
        assert_eq!(ev["type"], "channel_message");
        assert_eq!(ev["data"]["has_signal"], false);
        assert_eq!(ev["data"]["signal_type"], Value::Null);
        assert_eq!(ev["data"]["contract_addresses"], json!([]));
    }

    #[test]
    fn live_event_carries_detection_summary() {
        let det = parser::parse_message("🚀 $BTC pumping! Entry at $45000", "Alpha").unwrap();
        let ev = live_event(&raw("🚀 $BTC pumping! Entry at $45000"), Some(&det), Utc::now());
        assert_eq!(ev["data"]["has_signal"], true);
        assert_eq!(ev["data"]["token_symbol"], "BTC");
        assert_eq!(ev["data"]["signal_type"], "full_signal");
        assert_eq!(ev["data"]["sentiment"], "BULLISH");
    }

    #[test]
    fn live_event_preview_is_capped() {
        let long = "x".repeat(LIVE_PREVIEW_CHARS + 100);
        let ev = live_event(&raw(&long), None, Utc::now());
        assert_eq!(
            ev["data"]["text"].as_str().unwrap().chars().count(),
            LIVE_PREVIEW_CHARS
        );
    }
}
