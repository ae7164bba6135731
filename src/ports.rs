// src/ports.rs
//! Collaborator contracts consumed by the pipeline core.
//!
//! Storage, subscription lookup and the delivery channels are owned by the
//! surrounding application; the core only ever talks to them through these
//! traits. Every implementation must be cheap to clone behind an `Arc` and
//! safe to call from any worker task.

use anyhow::Result;
use serde_json::Value;

use crate::types::{Detection, Subscription};

/// Origin of a detection, passed alongside it on the persistence path.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext {
    pub channel_id: i64,
    pub message_id: i64,
    pub source_user_id: i64,
}

/// Record shape handed to the in-app notification store.
#[derive(Debug, Clone)]
pub struct InAppNotification {
    pub kind: String, // e.g. "signal"
    pub title: String,
    pub message: String,
    pub data: Value,
    pub token_symbol: Option<String>,
    pub contract_address: Option<String>,
    pub channel_name: String,
}

/// Durable storage for detections. May fail (network/DB); the worker logs
/// the failure and retries on a later duplicate arrival.
#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    async fn save(&self, detection: &Detection, ctx: &SignalContext) -> Result<i64>;
}

/// Read-only view of who subscribes to a source channel.
#[async_trait::async_trait]
pub trait SubscriptionDirectory: Send + Sync {
    async fn active_subscriptions(&self, channel_id: i64) -> Result<Vec<Subscription>>;
}

/// Best-effort realtime push (live feed + notification mirror). Failures
/// are swallowed at call sites.
#[async_trait::async_trait]
pub trait RealtimePush: Send + Sync {
    async fn send_to_subscriber(&self, subscriber_id: i64, payload: Value) -> Result<()>;
}

#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, subscriber_id: i64, notification: &InAppNotification) -> Result<i64>;
}

/// Echo a formatted alert back into the subscriber's own chat.
#[async_trait::async_trait]
pub trait ChatEcho: Send + Sync {
    async fn send_to_self(&self, subscriber_id: i64, text: &str) -> Result<()>;
}
