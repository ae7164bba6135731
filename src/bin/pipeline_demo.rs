//! Demo that drives the full pipeline with log-only collaborators:
//! two sources watching the same channel push identical messages, so the
//! console shows dedup, extraction, dispatch and the live feed end to end.

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crypto_signal_pipeline::ports::{
    ChatEcho, EmailSender, InAppNotification, NotificationStore, RealtimePush, SignalContext,
    SignalStore, SubscriptionDirectory,
};
use crypto_signal_pipeline::{
    Collaborators, Detection, Pipeline, PipelineConfig, RawMessage, Subscription,
};

/// Collaborators that just log what they would deliver.
struct LogPorts;

#[async_trait::async_trait]
impl SignalStore for LogPorts {
    async fn save(&self, detection: &Detection, ctx: &SignalContext) -> Result<i64> {
        tracing::info!(
            token = detection.token_symbol.as_deref().unwrap_or("?"),
            signal_type = detection.signal_type.as_str(),
            channel_id = ctx.channel_id,
            "store: signal saved"
        );
        Ok(ctx.message_id)
    }
}

#[async_trait::async_trait]
impl SubscriptionDirectory for LogPorts {
    async fn active_subscriptions(&self, channel_id: i64) -> Result<Vec<Subscription>> {
        Ok(vec![Subscription {
            subscriber_id: 1,
            channel_id,
            email: None,
            is_active: true,
            min_confidence: None,
            sentiment_filter: None,
            notify_email: false,
            notify_echo: true,
        }])
    }
}

#[async_trait::async_trait]
impl RealtimePush for LogPorts {
    async fn send_to_subscriber(&self, subscriber_id: i64, payload: Value) -> Result<()> {
        tracing::info!(
            subscriber_id,
            kind = payload["type"].as_str().unwrap_or("?"),
            "push: event delivered"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl EmailSender for LogPorts {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        tracing::info!(to, subject, "email: sent");
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationStore for LogPorts {
    async fn create(&self, subscriber_id: i64, notification: &InAppNotification) -> Result<i64> {
        tracing::info!(subscriber_id, title = %notification.title, "in-app: created");
        Ok(1)
    }
}

#[async_trait::async_trait]
impl ChatEcho for LogPorts {
    async fn send_to_self(&self, subscriber_id: i64, text: &str) -> Result<()> {
        let first_line = text.lines().next().unwrap_or_default();
        tracing::info!(subscriber_id, alert = first_line, "echo: sent to saved messages");
        Ok(())
    }
}

const DEMO_MESSAGES: &[&str] = &[
    "🚀 $BTC looking extremely bullish! Entry at $67000. Target: $75000. DYOR!",
    "📈 Strong buy signal on $ETH. Entry: $3500. TP1: $4000, TP2: $4500.",
    "💎 $SOL gem alert! Current: $180. Whale activity spotted. Entry now!",
    "⚠️ $DOGE showing weakness at $0.15. Consider taking profits.",
    "🔥 $PEPE breaking out! Entry: $0.000012. Target: 100% gains!",
    "fresh deploy on base: 0x1234567890abcdef1234567890abcdef12345678",
    "gm everyone, how is it going",
    "🎯 $ARB looking strong. Entry $1.20, SL $1.00, TP $2.00.",
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    let _ = dotenvy::dotenv();

    let ports = Arc::new(LogPorts);
    let collaborators = Collaborators {
        store: ports.clone(),
        directory: ports.clone(),
        push: ports.clone(),
        email: ports.clone(),
        notifications: ports.clone(),
        echo: ports,
    };

    let pipeline = Pipeline::new(PipelineConfig::from_env(), collaborators);
    pipeline.start();

    // Two accounts subscribed to the same channel: every message arrives
    // twice, the pipeline parses and saves it once.
    let sources = [pipeline.register_source(1), pipeline.register_source(2)];

    for (i, text) in DEMO_MESSAGES.iter().enumerate() {
        for handle in &sources {
            handle.push(RawMessage {
                source_user_id: handle.source_user_id(),
                channel_id: 1001,
                channel_name: "CryptoWhales".into(),
                message_id: i as i64 + 1,
                text: (*text).to_string(),
                received_at: Utc::now(),
            });
        }
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    }

    // Let the workers drain the tail.
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    let status = pipeline.status();
    println!(
        "pipeline-demo done: {} queued, {} dropped, {} dedup entries, {} sources",
        status.queue_depth, status.dropped, status.dedup_entries, status.connected_sources
    );

    pipeline.shutdown().await;
}
