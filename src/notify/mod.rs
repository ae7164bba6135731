// src/notify/mod.rs
//! # Notification Dispatcher
//! Given a detection and its source channel, loads the channel's active
//! subscriptions, applies per-subscriber filters and the cooldown gate,
//! then fans delivery out in parallel: in-app record + realtime push
//! always, email and chat echo when the subscription enables them.
//! Per-path failures are collected, never retried.

pub mod format;
pub mod ratelimit;

use chrono::Utc;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::ports::{ChatEcho, EmailSender, NotificationStore, RealtimePush, SubscriptionDirectory};
use crate::types::{Detection, Subscription};
use self::ratelimit::RateLimiter;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "notify_dispatched_total",
            "Subscribers that passed filters and cooldown and were dispatched to."
        );
        describe_counter!(
            "notify_rate_limited_total",
            "Subscribers skipped by the cooldown gate."
        );
        describe_counter!(
            "notify_filtered_total",
            "Subscribers skipped by confidence/sentiment filters."
        );
        describe_counter!(
            "notify_delivery_errors_total",
            "Individual delivery-path failures."
        );
    });
}

/// Aggregate outcome of one dispatch, for observability.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DispatchReport {
    pub total_subscribers: usize,
    /// Subscribers that passed the cooldown gate and filters; their
    /// delivery paths ran (possibly with per-path errors below).
    pub notified: usize,
    pub rate_limited: usize,
    pub filtered: usize,
    pub in_app_sent: usize,
    pub email_sent: usize,
    pub echo_sent: usize,
    pub errors: Vec<String>,
}

enum DeliveryPath {
    InApp,
    Email,
    Echo,
}

pub struct Dispatcher {
    directory: Arc<dyn SubscriptionDirectory>,
    notifications: Arc<dyn NotificationStore>,
    push: Arc<dyn RealtimePush>,
    email: Arc<dyn EmailSender>,
    echo: Arc<dyn ChatEcho>,
    limiter: RateLimiter,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<dyn SubscriptionDirectory>,
        notifications: Arc<dyn NotificationStore>,
        push: Arc<dyn RealtimePush>,
        email: Arc<dyn EmailSender>,
        echo: Arc<dyn ChatEcho>,
        cooldown_secs: i64,
        rate_limit_max_entries: usize,
    ) -> Self {
        ensure_metrics_described();
        Self {
            directory,
            notifications,
            push,
            email,
            echo,
            limiter: RateLimiter::new(cooldown_secs, rate_limit_max_entries),
        }
    }

    pub(crate) fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Notify all subscribers of `channel_id` about `detection`.
    pub async fn dispatch(&self, channel_id: i64, detection: &Detection) -> DispatchReport {
        let mut report = DispatchReport::default();

        let subscriptions = match self.directory.active_subscriptions(channel_id).await {
            Ok(subs) => subs,
            Err(e) => {
                tracing::warn!(channel_id, error = ?e, "subscription lookup failed");
                report.errors.push(format!("subscription lookup: {e:#}"));
                return report;
            }
        };
        report.total_subscribers = subscriptions.len();
        if subscriptions.is_empty() {
            tracing::debug!(channel_id, "no subscribers");
            return report;
        }

        let now = Utc::now();
        let mut deliveries: JoinSet<(DeliveryPath, i64, anyhow::Result<()>)> = JoinSet::new();

        for sub in subscriptions {
            if !sub.is_active {
                continue;
            }
            let key = (sub.subscriber_id, channel_id);
            if self.limiter.is_limited(key, now) {
                report.rate_limited += 1;
                counter!("notify_rate_limited_total").increment(1);
                continue;
            }
            if !passes_filters(&sub, detection) {
                report.filtered += 1;
                counter!("notify_filtered_total").increment(1);
                continue;
            }

            // Arm the cooldown before the deliveries run so concurrent
            // detections racing on the same subscriber cannot double-send.
            self.limiter.record(key, now);
            report.notified += 1;
            counter!("notify_dispatched_total").increment(1);

            self.spawn_deliveries(&mut deliveries, &sub, detection);
        }

        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok((path, _, Ok(()))) => match path {
                    DeliveryPath::InApp => report.in_app_sent += 1,
                    DeliveryPath::Email => report.email_sent += 1,
                    DeliveryPath::Echo => report.echo_sent += 1,
                },
                Ok((path, subscriber_id, Err(e))) => {
                    let label = match path {
                        DeliveryPath::InApp => "in-app",
                        DeliveryPath::Email => "email",
                        DeliveryPath::Echo => "echo",
                    };
                    counter!("notify_delivery_errors_total").increment(1);
                    report
                        .errors
                        .push(format!("{label} to {subscriber_id}: {e:#}"));
                }
                Err(join_err) => {
                    counter!("notify_delivery_errors_total").increment(1);
                    report.errors.push(format!("delivery task: {join_err}"));
                }
            }
        }

        tracing::info!(
            channel_id,
            notified = report.notified,
            rate_limited = report.rate_limited,
            filtered = report.filtered,
            errors = report.errors.len(),
            "dispatch complete"
        );
        report
    }

    fn spawn_deliveries(
        &self,
        deliveries: &mut JoinSet<(DeliveryPath, i64, anyhow::Result<()>)>,
        sub: &Subscription,
        detection: &Detection,
    ) {
        let subscriber_id = sub.subscriber_id;

        // In-app record + realtime mirror, always.
        {
            let notifications = self.notifications.clone();
            let push = self.push.clone();
            let notif = format::in_app_notification(detection);
            deliveries.spawn(async move {
                let result = notifications.create(subscriber_id, &notif).await;
                if result.is_ok() {
                    let payload = json!({
                        "type": "notification",
                        "data": {
                            "title": notif.title,
                            "message": notif.message,
                            "data": notif.data,
                        },
                        "timestamp": Utc::now(),
                    });
                    // Push mirror is best-effort; a dead socket is not a
                    // delivery failure.
                    if let Err(e) = push.send_to_subscriber(subscriber_id, payload).await {
                        tracing::debug!(subscriber_id, error = ?e, "notification push failed");
                    }
                }
                (DeliveryPath::InApp, subscriber_id, result.map(|_| ()))
            });
        }

        if sub.notify_email {
            if let Some(to) = sub.email.clone() {
                let email = self.email.clone();
                let subject = format::email_subject(detection);
                let body = format::email_body(detection);
                deliveries.spawn(async move {
                    let result = email.send(&to, &subject, &body).await;
                    (DeliveryPath::Email, subscriber_id, result)
                });
            }
        }

        if sub.notify_echo {
            let echo = self.echo.clone();
            let text = format::echo_message(detection);
            deliveries.spawn(async move {
                let result = echo.send_to_self(subscriber_id, &text).await;
                (DeliveryPath::Echo, subscriber_id, result)
            });
        }
    }
}

/// Subscription filters: minimum confidence is on the 0-100 scale, the
/// sentiment filter must match exactly when set.
fn passes_filters(sub: &Subscription, detection: &Detection) -> bool {
    if let Some(min_confidence) = sub.min_confidence {
        if detection.confidence * 100.0 < min_confidence {
            return false;
        }
    }
    if let Some(wanted) = sub.sentiment_filter {
        if wanted != detection.sentiment {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use crate::types::Sentiment;

    fn subscription() -> Subscription {
        Subscription {
            subscriber_id: 1,
            channel_id: 42,
            email: None,
            is_active: true,
            min_confidence: None,
            sentiment_filter: None,
            notify_email: false,
            notify_echo: false,
        }
    }

    fn detection() -> Detection {
        parser::parse_message("🚀 $BTC pumping! Entry at $45000", "Alpha").unwrap()
    }

    #[test]
    fn no_filters_passes() {
        assert!(passes_filters(&subscription(), &detection()));
    }

    #[test]
    fn min_confidence_is_percent_scale() {
        let det = detection(); // confidence 0.75
        let mut sub = subscription();
        sub.min_confidence = Some(70.0);
        assert!(passes_filters(&sub, &det));
        sub.min_confidence = Some(90.0);
        assert!(!passes_filters(&sub, &det));
    }

    #[test]
    fn sentiment_filter_must_match() {
        let det = detection(); // BULLISH
        let mut sub = subscription();
        sub.sentiment_filter = Some(Sentiment::Bullish);
        assert!(passes_filters(&sub, &det));
        sub.sentiment_filter = Some(Sentiment::Bearish);
        assert!(!passes_filters(&sub, &det));
    }
}
