// src/parser/sentiment.rs
//! Keyword/emoji sentiment scoring for chat messages.
//!
//! Scoring is presence-based: each keyword or emoji from the fixed lists
//! counts once no matter how often it appears. Keywords weigh 1.0, emojis
//! 0.5. Both sides zero or a tie → NEUTRAL with confidence 0.5.

use crate::types::Sentiment;

const BULLISH_KEYWORDS: &[&str] = &[
    "buy", "long", "bullish", "moon", "pump", "rocket", "breakout", "accumulate",
    "accumulation", "gem", "alpha", "ape", "send it", "dip", "oversold", "undervalued",
    "strong", "bullrun", "bull run", "bag", "load up", "early", "easy", "100x", "1000x",
    "lowcap", "low cap", "micro cap", "next", "call", "launch", "stealth", "aping", "safu",
    "moonshot", "hidden gem",
];

const BEARISH_KEYWORDS: &[&str] = &[
    "sell", "short", "bearish", "dump", "crash", "distribution", "overbought", "overvalued",
    "weak", "exit", "take profit", "warning", "caution", "risk", "bear", "drop", "falling",
    "rug", "rugpull", "scam", "honeypot", "avoid", "stay away",
];

const BULLISH_EMOJIS: &[&str] = &[
    "🚀", "📈", "💎", "🔥", "⚡", "💰", "🌙", "✨", "💪", "🎯", "🟢", "✅",
];

const BEARISH_EMOJIS: &[&str] = &[
    "📉", "🔴", "⚠️", "🐻", "💀", "🆘", "❌", "⬇️", "🩸", "☠️",
];

/// Returns `(sentiment, confidence)`. Keyword matching is done on the
/// lower-cased text; emoji matching on the raw text.
pub fn analyze(text: &str) -> (Sentiment, f32) {
    let lower = text.to_lowercase();

    let mut bull = BULLISH_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count() as f32;
    let mut bear = BEARISH_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count() as f32;
    bull += 0.5 * BULLISH_EMOJIS.iter().filter(|e| text.contains(*e)).count() as f32;
    bear += 0.5 * BEARISH_EMOJIS.iter().filter(|e| text.contains(*e)).count() as f32;

    if bull == 0.0 && bear == 0.0 {
        return (Sentiment::Neutral, 0.5);
    }
    if bull > bear {
        (Sentiment::Bullish, (0.5 + (bull - bear) / 10.0).min(0.95))
    } else if bear > bull {
        (Sentiment::Bearish, (0.5 + (bear - bull) / 10.0).min(0.95))
    } else {
        (Sentiment::Neutral, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullish_keywords_and_emoji_win() {
        let (s, c) = analyze("🚀 pump incoming, moon soon");
        assert_eq!(s, Sentiment::Bullish);
        // two keywords + one emoji → 0.5 + 2.5/10
        assert!((c - 0.75).abs() < 1e-6);
    }

    #[test]
    fn bearish_side() {
        let (s, c) = analyze("rug warning, avoid this scam");
        assert_eq!(s, Sentiment::Bearish);
        assert!(c > 0.5 && c <= 0.95);
    }

    #[test]
    fn tie_is_neutral_half() {
        // one bullish keyword vs one bearish keyword, no emoji
        let (s, c) = analyze("moon or crash, who knows");
        assert_eq!(s, Sentiment::Neutral);
        assert_eq!(c, 0.5);
    }

    #[test]
    fn no_hits_is_neutral_half() {
        let (s, c) = analyze("quarterly report attached");
        assert_eq!(s, Sentiment::Neutral);
        assert_eq!(c, 0.5);
    }

    #[test]
    fn confidence_caps_at_095() {
        let (s, c) = analyze(
            "buy long bullish moon pump rocket breakout gem alpha strong early easy call launch",
        );
        assert_eq!(s, Sentiment::Bullish);
        assert_eq!(c, 0.95);
    }
}
