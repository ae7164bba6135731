// src/parser/tags.rs
//! Topic tag heuristics. Fixed keyword → tag table, at most 6 tags per
//! message, checked in table order.

const TAG_TABLE: &[(&str, &[&str])] = &[
    ("breakout", &["breakout", "breaking out", "broke out"]),
    ("accumulation", &["accumulate", "accumulation", "accumulating"]),
    ("whale_alert", &["whale", "whales", "big buy", "big order"]),
    ("technical", &["chart", "ta ", "technical", "pattern", "indicator"]),
    ("fundamental", &["news", "announcement", "partnership", "listing"]),
    ("high_risk", &["high risk", "risky", "degen", "yolo", "gamble"]),
    ("low_risk", &["safe", "low risk", "conservative"]),
    ("swing_trade", &["swing", "swing trade"]),
    ("scalp", &["scalp", "quick flip", "fast trade"]),
    ("dip_buy", &["dip", "buying the dip", "discount", "cheap"]),
    ("momentum", &["momentum", "strength"]),
    ("reversal", &["reversal", "reverse", "bounce"]),
    ("new_launch", &["launch", "stealth", "fair launch", "just launched"]),
    ("airdrop", &["airdrop", "drop", "claim"]),
];

pub const MAX_TAGS: usize = 6;

pub fn extract(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TAG_TABLE
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(tag, _)| (*tag).to_string())
        .take(MAX_TAGS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_in_table_order() {
        let tags = extract("Whale accumulation on the chart, big breakout soon");
        assert_eq!(tags, vec!["breakout", "accumulation", "whale_alert", "technical"]);
    }

    #[test]
    fn caps_at_six() {
        let text = "breakout accumulation whale chart news risky safe swing scalp dip";
        assert_eq!(extract(text).len(), MAX_TAGS);
    }

    #[test]
    fn empty_when_nothing_matches() {
        assert!(extract("gm everyone").is_empty());
    }
}
