// src/parser/mod.rs
//! # Extraction Engine
//! Pure, deterministic scanning of raw chat text for trading-relevant
//! structure: contract addresses, token symbols, chain hints, price
//! levels, sentiment and topic tags. No I/O, no shared mutable state —
//! safe to call from any number of workers without synchronization.
//!
//! A message yields a [`Detection`] only when at least one token symbol
//! or contract address is found; price data upgrades it to a full signal.

pub mod patterns;
pub mod sentiment;
pub mod tags;

use crate::types::{Detection, SignalType};

/// Ordered contract address list cap.
pub const MAX_CONTRACT_ADDRESSES: usize = 5;

/// Minimum message length worth scanning.
const MIN_TEXT_CHARS: usize = 5;

/// Plausible price bounds for the entry-price fallback scan.
const PRICE_MIN: f64 = 1e-7;
const PRICE_MAX: f64 = 1e7;

/// Scan one message. Returns `None` when nothing crypto-relevant was
/// found; otherwise a [`Detection`] classified per the rules above.
pub fn parse_message(text: &str, channel_name: &str) -> Option<Detection> {
    if text.chars().count() < MIN_TEXT_CHARS {
        return None;
    }

    let mut contract_addresses = extract_contract_addresses(text);
    for addr in extract_dex_url_addresses(text) {
        if !contract_addresses.contains(&addr) {
            contract_addresses.push(addr);
        }
    }
    contract_addresses.truncate(MAX_CONTRACT_ADDRESSES);

    let chain = detect_chain(text);
    let tokens = extract_tokens(text);

    if tokens.is_empty() && contract_addresses.is_empty() {
        return None;
    }

    let mut entry_price = capture_amount(&patterns::ENTRY, text);
    if entry_price.is_none() {
        entry_price = first_plausible_price(text);
    }
    let target_price = capture_amount(&patterns::TARGET, text);
    let stop_loss = capture_amount(&patterns::STOP_LOSS, text);
    let market_cap = extract_market_cap(text);

    let (sentiment, mut confidence) = sentiment::analyze(text);
    if !contract_addresses.is_empty() {
        confidence = (confidence + 0.15).min(0.99);
    }
    if entry_price.is_some() {
        confidence = (confidence + 0.10).min(0.99);
    }

    let has_price = entry_price.is_some();
    let has_contract = !contract_addresses.is_empty();
    let has_token = !tokens.is_empty();

    let signal_type = if has_price && (has_token || has_contract) {
        SignalType::FullSignal
    } else if has_contract {
        SignalType::ContractDetection
    } else {
        SignalType::TokenMention
    };

    let token_symbol = tokens.first().cloned().or_else(|| {
        contract_addresses
            .first()
            .map(|addr| format!("CA:{}…{}", &addr[..6], &addr[addr.len() - 4..]))
    });
    let token_name = token_symbol
        .as_deref()
        .map(|sym| patterns::known_token_name(sym).unwrap_or(sym).to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut tag_list = tags::extract(text);
    tag_list.push(signal_type.as_str().to_string());

    Some(Detection {
        token_symbol,
        token_name,
        contract_addresses,
        chain,
        entry_price,
        target_price,
        stop_loss,
        market_cap,
        sentiment,
        confidence,
        signal_type,
        tags: tag_list,
        channel_name: channel_name.to_string(),
        source_text: text.to_string(),
    })
}

/// EVM addresses (lower-cased) then base-58 candidates, first-seen order,
/// deduplicated.
fn extract_contract_addresses(text: &str) -> Vec<String> {
    let mut addresses: Vec<String> = Vec::new();

    for caps in patterns::EVM_ADDRESS.captures_iter(text) {
        let low = caps[1].to_ascii_lowercase();
        if !addresses.contains(&low) {
            addresses.push(low);
        }
    }

    for caps in patterns::BASE58_ADDRESS.captures_iter(text) {
        let addr = &caps[1];
        let purely_alphabetic = addr.chars().all(|c| c.is_ascii_alphabetic());
        let path_like = addr.contains(['/', '\\', '.']);
        if !purely_alphabetic && !path_like && !addresses.iter().any(|a| a == addr) {
            addresses.push(addr.to_string());
        }
    }

    addresses
}

/// Contract addresses embedded inside DEX / scanner URLs.
fn extract_dex_url_addresses(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in patterns::DEX_URL.captures_iter(text) {
        let raw = &caps[1];
        let normalized = if raw.starts_with("0x") {
            raw.to_ascii_lowercase()
        } else {
            raw.to_string()
        };
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

/// Chain from an explicit keyword, else an explorer-domain hint, else a
/// generic EVM default when a hex address is present.
fn detect_chain(text: &str) -> Option<String> {
    if let Some(caps) = patterns::CHAIN_KEYWORD.captures(text) {
        return Some(patterns::normalize_chain(&caps[1]));
    }

    let lower = text.to_lowercase();
    for (fragment, chain) in patterns::CHAIN_DOMAIN_HINTS {
        if lower.contains(fragment) {
            return Some((*chain).to_string());
        }
    }

    if patterns::EVM_ADDRESS.is_match(text) {
        return Some("eth".to_string());
    }

    None
}

/// Token symbols with strict priority: cashtags, then known tickers, then
/// plausible bare uppercase words. Case-insensitive dedup, first-seen
/// order preserved.
fn extract_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let add = |sym: &str, tokens: &mut Vec<String>| {
        let upper = sym.to_ascii_uppercase();
        if patterns::NOISE_WORDS.contains(upper.as_str()) {
            return;
        }
        if !tokens.iter().any(|t| *t == upper) {
            tokens.push(upper);
        }
    };

    for caps in patterns::CASHTAG.captures_iter(text) {
        add(&caps[1], &mut tokens);
    }
    for caps in patterns::BARE_TOKEN.captures_iter(text) {
        if patterns::KNOWN_TOKENS.contains(&caps[1]) {
            add(&caps[1], &mut tokens);
        }
    }
    for caps in patterns::BARE_TOKEN.captures_iter(text) {
        let sym = &caps[1];
        if (3..=6).contains(&sym.len()) && !patterns::NOISE_WORDS.contains(sym) {
            add(sym, &mut tokens);
        }
    }

    tokens
}

/// First capture of `re` parsed as an amount (thousands separators
/// tolerated).
fn capture_amount(re: &regex::Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| parse_amount(caps.get(1)?.as_str()))
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

/// Market cap with optional `k/m/b` multiplier, e.g. "mcap: 2.5m".
fn extract_market_cap(text: &str) -> Option<f64> {
    let caps = patterns::MARKET_CAP.captures(text)?;
    let val = parse_amount(caps.get(1)?.as_str())?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(s) if s == "k" => 1_000.0,
        Some(s) if s == "m" => 1_000_000.0,
        Some(s) if s == "b" => 1_000_000_000.0,
        _ => 1.0,
    };
    Some(val * multiplier)
}

/// Entry-price fallback: first `$`-prefixed or USD(T)-suffixed number in
/// plausible bounds.
fn first_plausible_price(text: &str) -> Option<f64> {
    for caps in patterns::PRICE.captures_iter(text) {
        let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
        if let Some(val) = parse_amount(raw) {
            if (PRICE_MIN..=PRICE_MAX).contains(&val) {
                return Some(val);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sentiment;

    const EVM_ADDR: &str = "0x1234567890abcdef1234567890abcdef12345678";

    #[test]
    fn short_text_is_rejected() {
        assert!(parse_message("gm", "Chan").is_none());
        assert!(parse_message("", "Chan").is_none());
    }

    #[test]
    fn hex_addresses_are_lowercased_and_deduped() {
        let text = format!(
            "0x1234567890ABCDEF1234567890abcdef12345678 and again {EVM_ADDR}"
        );
        let addrs = extract_contract_addresses(&text);
        assert_eq!(addrs, vec![EVM_ADDR.to_string()]);
    }

    #[test]
    fn base58_heuristic_filters_alphabetic_runs() {
        // 35 letters only — looks like base58 but carries no digit
        let noise = "abcdefghijkmnopqrstuvwxyzABCDEFGHJK";
        assert!(extract_contract_addresses(noise).is_empty());

        let mint = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
        let addrs = extract_contract_addresses(&format!("mint {mint} live"));
        assert_eq!(addrs, vec![mint.to_string()]);
    }

    #[test]
    fn dex_url_addresses_merge_into_contract_list() {
        let text = format!("https://dexscreener.com/ethereum/{}", EVM_ADDR.to_uppercase().replace("0X", "0x"));
        let det = parse_message(&text, "Chan").unwrap();
        assert_eq!(det.contract_addresses, vec![EVM_ADDR.to_string()]);
        assert_eq!(det.signal_type, SignalType::ContractDetection);
    }

    #[test]
    fn contract_list_caps_at_five() {
        let mut text = String::new();
        for i in 0..7 {
            text.push_str(&format!("0x{:040x} ", i + 1));
        }
        let det = parse_message(&text, "Chan").unwrap();
        assert_eq!(det.contract_addresses.len(), MAX_CONTRACT_ADDRESSES);
    }

    #[test]
    fn chain_keyword_beats_domain_hint() {
        let det =
            parse_message("$PEPE on arbitrum https://solscan.io/token/abc", "Chan").unwrap();
        assert_eq!(det.chain.as_deref(), Some("arbitrum"));
    }

    #[test]
    fn domain_hint_orders_solana_first() {
        let det = parse_message("$WIF https://pump.fun/coin/xyz", "Chan").unwrap();
        assert_eq!(det.chain.as_deref(), Some("solana"));
    }

    #[test]
    fn cashtags_come_before_bare_tokens() {
        let det = parse_message("$WAGMI says BTC is fine", "Chan").unwrap();
        assert_eq!(
            det.token_symbol.as_deref(),
            Some("WAGMI"),
            "explicit cashtag wins the primary slot"
        );
        assert_eq!(det.token_name, "WAGMI");
    }

    #[test]
    fn noise_words_never_become_tokens() {
        assert!(parse_message("THIS IS THE BEST DAY", "Chan").is_none());
    }

    #[test]
    fn entry_marker_beats_fallback() {
        let det = parse_message("$SOL entry: $180, also worth $9999", "Chan").unwrap();
        assert_eq!(det.entry_price, Some(180.0));
    }

    #[test]
    fn target_stop_and_mcap_parse_independently() {
        let det = parse_message(
            "$ARB entry $1.20, SL: $1.00, TP: $2.00, mcap: 2.5m",
            "Chan",
        )
        .unwrap();
        assert_eq!(det.entry_price, Some(1.20));
        assert_eq!(det.stop_loss, Some(1.00));
        assert_eq!(det.target_price, Some(2.00));
        assert_eq!(det.market_cap, Some(2_500_000.0));
        assert!(det.is_full_signal());
    }

    #[test]
    fn usd_suffixed_fallback_price_is_used() {
        let det = parse_message("$PEPE trading around 0.000012 USDT", "Chan").unwrap();
        assert_eq!(det.entry_price, Some(0.000012));
    }

    #[test]
    fn out_of_range_prices_are_skipped() {
        let det = parse_message("$BTC market is worth $99999999999 total", "Chan").unwrap();
        assert_eq!(det.entry_price, None);
    }

    #[test]
    fn synthetic_label_when_only_contract_found() {
        let det = parse_message(&format!("fresh deploy {EVM_ADDR}"), "Chan").unwrap();
        assert_eq!(det.token_symbol.as_deref(), Some("CA:0x1234…5678"));
        assert_eq!(det.token_name, "CA:0x1234…5678");
    }

    #[test]
    fn confidence_boosts_stack_and_cap() {
        let det = parse_message(
            &format!("🚀 moon pump gem alpha strong early call launch easy buy long {EVM_ADDR} entry: $1"),
            "Chan",
        )
        .unwrap();
        assert_eq!(det.sentiment, Sentiment::Bullish);
        assert_eq!(det.confidence, 0.99);
    }

    #[test]
    fn signal_type_tag_is_appended() {
        let det = parse_message("$BTC breakout!", "Chan").unwrap();
        assert_eq!(det.tags.last().map(String::as_str), Some("token_mention"));
        assert!(det.tags.iter().any(|t| t == "breakout"));
    }
}
