// src/notify/format.rs
//! Rendering of detections into the delivery-channel payload shapes:
//! chat echo text, in-app record, email subject/body.

use serde_json::json;

use crate::ports::InAppNotification;
use crate::types::{Detection, Sentiment, SignalType};

const ECHO_TEXT_LIMIT: usize = 500;

pub(crate) fn sentiment_emoji(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Bullish => "🚀",
        Sentiment::Bearish => "📉",
        Sentiment::Neutral => "👀",
    }
}

fn type_label(signal_type: SignalType) -> &'static str {
    match signal_type {
        SignalType::FullSignal => "Signal",
        SignalType::ContractDetection => "Contract Detected",
        SignalType::TokenMention => "Token Mentioned",
    }
}

/// Short label used in in-app titles, e.g. "👀 Mention: PEPE (ETH)".
fn short_type_label(signal_type: SignalType) -> &'static str {
    match signal_type {
        SignalType::TokenMention => "Mention",
        other => type_label(other),
    }
}

/// Price rendered with trailing zeros trimmed: 45000 → "$45000",
/// 0.000012 → "$0.000012".
pub(crate) fn fmt_price(price: f64) -> String {
    let s = format!("{price:.8}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    format!("${s}")
}

fn short_contract(addr: &str) -> String {
    if addr.len() <= 10 {
        return addr.to_string();
    }
    format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
}

fn token_label(detection: &Detection) -> &str {
    detection.token_symbol.as_deref().unwrap_or("UNKNOWN")
}

/// Multi-line alert text echoed back into the subscriber's own chat.
pub fn echo_message(detection: &Detection) -> String {
    let token = token_label(detection);
    let mut lines = vec![
        format!(
            "{} {}",
            sentiment_emoji(detection.sentiment),
            type_label(detection.signal_type)
        ),
        String::new(),
        format!("Token: ${token} ({})", detection.token_name),
    ];

    if let Some(chain) = &detection.chain {
        lines.push(format!("Chain: {}", chain.to_uppercase()));
    }
    for ca in &detection.contract_addresses {
        lines.push(format!("CA: {ca}"));
    }

    lines.push(format!(
        "Confidence: {}%",
        (detection.confidence * 100.0) as u32
    ));
    lines.push(format!("Channel: {}", detection.channel_name));

    if let Some(price) = detection.entry_price {
        lines.push(format!("Entry: {}", fmt_price(price)));
    }
    if let Some(target) = detection.target_price {
        lines.push(format!("Target: {}", fmt_price(target)));
    }
    if let Some(stop) = detection.stop_loss {
        lines.push(format!("Stop Loss: {}", fmt_price(stop)));
    }

    if !detection.source_text.is_empty() {
        let preview: String = detection.source_text.chars().take(ECHO_TEXT_LIMIT).collect();
        lines.push(String::new());
        lines.push("Original Message:".to_string());
        lines.push(preview);
    }

    lines.push(String::new());
    lines.push("⚠️ DYOR. Not financial advice.".to_string());
    lines.join("\n")
}

/// The persistent in-app record: "🚀 Signal: PEPE (ETH)" plus a compact
/// one-line body like "From Alpha Calls · CA: 0x1234...5678 · Price:
/// $0.0012 · 93% Conf".
pub fn in_app_notification(detection: &Detection) -> InAppNotification {
    let token = token_label(detection);
    let chain_label = detection
        .chain
        .as_deref()
        .map(|c| format!(" ({})", c.to_uppercase()))
        .unwrap_or_default();
    let title = format!(
        "{} {}: {token}{chain_label}",
        sentiment_emoji(detection.sentiment),
        short_type_label(detection.signal_type)
    );

    let mut parts = vec![format!("From {}", detection.channel_name)];
    if let Some(ca) = detection.contract_addresses.first() {
        parts.push(format!("CA: {}", short_contract(ca)));
    }
    if let Some(price) = detection.entry_price {
        parts.push(format!("Price: {}", fmt_price(price)));
    }
    if detection.confidence > 0.8 {
        parts.push(format!("{}% Conf", (detection.confidence * 100.0) as u32));
    }

    InAppNotification {
        kind: "signal".to_string(),
        title,
        message: parts.join(" · "),
        data: json!({
            "token_symbol": token,
            "token_name": detection.token_name,
            "sentiment": detection.sentiment,
            "price": detection.entry_price,
            "confidence": detection.confidence,
            "channel": detection.channel_name,
            "contract_addresses": detection.contract_addresses,
            "chain": detection.chain,
            "signal_type": detection.signal_type,
            "target_price": detection.target_price,
            "stop_loss": detection.stop_loss,
        }),
        token_symbol: detection.token_symbol.clone(),
        contract_address: detection.contract_addresses.first().cloned(),
        channel_name: detection.channel_name.clone(),
    }
}

/// Email subject: "🚀 Signal: PEPE (Pepe) (ETH)" — token name only when it
/// adds information over the bare symbol.
pub fn email_subject(detection: &Detection) -> String {
    let token = token_label(detection);
    let name_display = if detection.token_name != "Unknown" && detection.token_name != token {
        format!(" ({})", detection.token_name)
    } else {
        String::new()
    };
    let chain_label = detection
        .chain
        .as_deref()
        .map(|c| format!(" ({})", c.to_uppercase()))
        .unwrap_or_default();
    format!(
        "{} {}: {token}{name_display}{chain_label}",
        sentiment_emoji(detection.sentiment),
        type_label(detection.signal_type)
    )
}

/// Plain-text email body; same content as the chat echo.
pub fn email_body(detection: &Detection) -> String {
    echo_message(detection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn full_signal() -> Detection {
        parser::parse_message(
            "🚀 $PEPE breaking out on eth chain! entry: $0.000012, TP: $0.00002 \
             0x1234567890abcdef1234567890abcdef12345678",
            "Alpha Calls",
        )
        .unwrap()
    }

    #[test]
    fn fmt_price_trims_trailing_zeros() {
        assert_eq!(fmt_price(45_000.0), "$45000");
        assert_eq!(fmt_price(0.000012), "$0.000012");
        assert_eq!(fmt_price(1.20), "$1.2");
    }

    #[test]
    fn echo_message_carries_core_fields() {
        let text = echo_message(&full_signal());
        assert!(text.starts_with("🚀 Signal"));
        assert!(text.contains("Token: $PEPE (Pepe)"));
        assert!(text.contains("Chain: ETH"));
        assert!(text.contains("CA: 0x1234567890abcdef1234567890abcdef12345678"));
        assert!(text.contains("Entry: $0.000012"));
        assert!(text.contains("Original Message:"));
    }

    #[test]
    fn in_app_title_and_compact_body() {
        let notif = in_app_notification(&full_signal());
        assert_eq!(notif.kind, "signal");
        assert!(notif.title.contains("Signal: PEPE (ETH)"));
        assert!(notif.message.starts_with("From Alpha Calls"));
        assert!(notif.message.contains("CA: 0x1234...5678"));
        assert_eq!(notif.channel_name, "Alpha Calls");
        assert_eq!(notif.data["sentiment"], "BULLISH");
    }

    #[test]
    fn email_subject_skips_redundant_name() {
        let mut det = full_signal();
        det.token_name = det.token_symbol.clone().unwrap();
        let subject = email_subject(&det);
        assert_eq!(subject, "🚀 Signal: PEPE (ETH)");
    }
}
