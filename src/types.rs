// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat message as handed over by a source adapter.
/// Lives on the ingestion queue until a worker consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawMessage {
    pub source_user_id: i64,
    pub channel_id: i64,
    pub channel_name: String,
    pub message_id: i64,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "BULLISH",
            Sentiment::Bearish => "BEARISH",
            Sentiment::Neutral => "NEUTRAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    FullSignal,
    ContractDetection,
    TokenMention,
}

impl SignalType {
    /// Wire/tag label, e.g. `full_signal`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::FullSignal => "full_signal",
            SignalType::ContractDetection => "contract_detection",
            SignalType::TokenMention => "token_mention",
        }
    }
}

/// Structured result of scanning one message for trading-relevant content.
///
/// A `Detection` only exists when at least one token symbol or contract
/// address was found in the text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub token_symbol: Option<String>,
    pub token_name: String,
    /// Ordered, deduplicated, hex addresses lower-cased. At most 5.
    pub contract_addresses: Vec<String>,
    pub chain: Option<String>,
    pub entry_price: Option<f64>,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub market_cap: Option<f64>,
    pub sentiment: Sentiment,
    pub confidence: f32, // 0.0 .. 1.0
    pub signal_type: SignalType,
    pub tags: Vec<String>,
    pub channel_name: String,
    pub source_text: String,
}

impl Detection {
    /// A detection is valid when it carries a contract address OR a token
    /// symbol. Holds for every `Detection` the parser emits, but callers
    /// (worker, dispatcher) gate on it explicitly.
    pub fn is_valid(&self) -> bool {
        !self.contract_addresses.is_empty() || self.token_symbol.is_some()
    }

    /// Valid AND carries a positive entry price.
    pub fn is_full_signal(&self) -> bool {
        self.is_valid() && self.entry_price.is_some_and(|p| p > 0.0)
    }
}

/// Per (subscriber, source-channel) notification preferences.
/// Owned by account management; read-only to this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber_id: i64,
    pub channel_id: i64,
    pub email: Option<String>,
    pub is_active: bool,
    /// Percent scale 0-100 (detection confidence is 0.0-1.0).
    pub min_confidence: Option<f32>,
    pub sentiment_filter: Option<Sentiment>,
    pub notify_email: bool,
    pub notify_echo: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_detection() -> Detection {
        Detection {
            token_symbol: Some("BTC".into()),
            token_name: "Bitcoin".into(),
            contract_addresses: Vec::new(),
            chain: None,
            entry_price: None,
            target_price: None,
            stop_loss: None,
            market_cap: None,
            sentiment: Sentiment::Neutral,
            confidence: 0.5,
            signal_type: SignalType::TokenMention,
            tags: vec!["token_mention".into()],
            channel_name: "Test".into(),
            source_text: "BTC".into(),
        }
    }

    #[test]
    fn full_signal_needs_positive_price() {
        let mut d = bare_detection();
        assert!(d.is_valid());
        assert!(!d.is_full_signal());
        d.entry_price = Some(0.0);
        assert!(!d.is_full_signal());
        d.entry_price = Some(45_000.0);
        assert!(d.is_full_signal());
    }

    #[test]
    fn serde_labels_match_wire_format() {
        let s = serde_json::to_string(&Sentiment::Bullish).unwrap();
        assert_eq!(s, r#""BULLISH""#);
        let t = serde_json::to_string(&SignalType::ContractDetection).unwrap();
        assert_eq!(t, r#""contract_detection""#);
    }
}
