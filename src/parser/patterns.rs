// src/parser/patterns.rs
//! Compiled regexes and fixed lookup tables for the extraction engine.
//! Everything here is built once via `Lazy` and only ever read afterwards.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// --- Contract address patterns ---

/// EVM: 0x + 40 hex chars.
pub static EVM_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(0x[a-fA-F0-9]{40})\b").expect("evm address regex"));

/// Base-58-ish (32-44 chars, no 0/O/I/l). Heuristic; callers apply extra
/// filters (not purely alphabetic, no path separators).
pub static BASE58_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([1-9A-HJ-NP-Za-km-z]{32,44})\b").expect("base58 address regex"));

/// DEX / scanner URLs that embed a contract address.
pub static DEX_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:dexscreener\.com|dextools\.io|birdeye\.so|geckoterminal\.com|defined\.fi|pump\.fun|raydium\.io|solscan\.io|etherscan\.io|bscscan\.com|basescan\.org|arbiscan\.io|polygonscan\.com)[/\w\-]*?/?(0x[a-fA-F0-9]{40}|[1-9A-HJ-NP-Za-km-z]{32,44})",
    )
    .expect("dex url regex")
});

// --- Token symbol patterns ---

/// Explicit $SYMBOL or #SYMBOL.
pub static CASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$#]([A-Za-z]{2,12})\b").expect("cashtag regex"));

/// Bare uppercase tickers, word-bounded.
pub static BARE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{2,10})\b").expect("bare token regex"));

// --- Chain identifiers ---

pub static CHAIN_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(ethereum|eth\s+chain|bsc|bnb\s*chain|polygon|matic|arbitrum|arb|optimism|op\s+chain|avalanche|avax|base\s+chain|base|solana|sol\s+chain|fantom|ftm|cronos|cro|gnosis|linea|zksync|scroll|blast|mantle|sui\s+chain|aptos|ton|tron)\b",
    )
    .expect("chain keyword regex")
});

/// Normalize a matched chain keyword to its canonical slug. Unknown
/// keywords pass through unchanged.
pub fn normalize_chain(raw: &str) -> String {
    let collapsed = raw
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let canonical = match collapsed.as_str() {
        "ethereum" | "eth chain" | "eth" => "eth",
        "bsc" | "bnb chain" | "bnbchain" => "bsc",
        "polygon" | "matic" => "polygon",
        "arbitrum" | "arb" => "arbitrum",
        "optimism" | "op chain" => "optimism",
        "avalanche" | "avax" => "avalanche",
        "base chain" | "base" => "base",
        "solana" | "sol chain" => "solana",
        "fantom" | "ftm" => "fantom",
        "cronos" | "cro" => "cronos",
        "sui chain" => "sui",
        other => return other.to_string(),
    };
    canonical.to_string()
}

/// Explorer/aggregator domain fragments that pin a chain, checked in
/// priority order when no explicit keyword matched.
pub const CHAIN_DOMAIN_HINTS: &[(&str, &str)] = &[
    ("solscan.io", "solana"),
    ("birdeye.so", "solana"),
    ("pump.fun", "solana"),
    ("basescan.org", "base"),
    ("arbiscan.io", "arbitrum"),
    ("bscscan.com", "bsc"),
    ("polygonscan.com", "polygon"),
];

// --- Price patterns ---

/// `$0.0012` or `0.0012 USDT` style amounts anywhere in the text.
pub static PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$\s*([\d,]+\.?\d*)\b|([\d,]+\.?\d*)\s*(?:usd|usdt|busd)\b")
        .expect("price regex")
});

pub static TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:tp\d?|target\d?|take\s*profit)[:\s]*\$?([\d,]+\.?\d*)")
        .expect("target regex")
});

pub static STOP_LOSS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:sl|stop\s*loss|stop)[:\s]*\$?([\d,]+\.?\d*)").expect("stop loss regex")
});

pub static ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:entry|buy\s*(?:at|zone|price)?|enter\s*at|current\s*price|@)[:\s]*\$?([\d,]+\.?\d*)")
        .expect("entry regex")
});

pub static MARKET_CAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:mc|market\s*cap|mcap)[:\s]*\$?([\d,.]+)\s*([kmb])?")
        .expect("market cap regex")
});

// --- Known tickers (allow-list for bare uppercase matches) ---

pub static KNOWN_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "BTC", "ETH", "SOL", "DOGE", "PEPE", "SHIB", "LINK", "MATIC", "AVAX", "DOT", "ADA",
        "XRP", "BNB", "ATOM", "UNI", "AAVE", "LTC", "FTM", "NEAR", "APT", "ARB", "OP", "INJ",
        "SUI", "WIF", "BONK", "JUP", "WLD", "TIA", "SEI", "PYTH", "JTO", "ONDO", "STRK", "DYM",
        "MANTA", "PIXEL", "AI", "RNDR", "FET", "AGIX", "OCEAN", "TAO", "RENDER", "GRT", "FIL",
        "IMX", "BLUR", "MEME", "FLOKI", "LUNC", "ORDI", "SATS", "RUNE", "STX", "PENDLE", "GMX",
        "RDNT", "CAKE", "DYDX", "TON", "NOT", "DOGS", "HMSTR", "CATI", "BOME", "MEW", "POPCAT",
        "MYRO", "SAMO", "RAY", "ORCA", "DRIFT", "TENSOR", "TRUMP", "MELANIA", "SPX", "MOG",
        "BRETT", "TOSHI", "DEGEN",
    ]
    .into_iter()
    .collect()
});

// --- Noise words (common English + generic crypto jargon) ---

/// Uppercase words that look like tickers but never are.
pub static NOISE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "THE", "AND", "FOR", "WITH", "THIS", "THAT", "FROM", "ARE", "WAS", "BUT", "HAS", "HAD",
        "NOT", "ALL", "CAN", "HER", "WHO", "OIL", "DID", "GET", "LET", "SAY", "SHE", "TOO",
        "USE", "WAY", "MAY", "DAY", "ANY", "NEW", "NOW", "OLD", "SEE", "TIME", "VERY", "WHEN",
        "COME", "MAKE", "LIKE", "JUST", "KNOW", "TAKE", "TEAM", "GOOD", "BEEN", "CALL", "FIRST",
        "LONG", "DOWN", "FIND", "HERE", "THING", "MANY", "WELL", "ONLY", "TELL", "ONE", "OUR",
        "OUT", "ALSO", "BACK", "AFTER", "YEAR", "THAN", "MOST", "THEM", "KEEP", "EVEN", "LEFT",
        "BEST", "NEXT", "WILL", "STILL", "OWN", "LOOK", "SAME", "BEING", "WORLD", "INTO",
        "DOES", "DONT", "PART", "HEAD", "LIVE", "HIGH", "MUST", "HOME", "BIG", "ABOUT", "EACH",
        "SOME", "THEY", "WHAT", "YOUR", "OVER", "MUCH", "THEN", "THESE", "TWO", "HOW", "PRICE",
        "BUY", "SELL", "HOLD", "UPDATE", "JOIN", "FREE", "NFT", "DEX", "CEX", "APE", "GEM",
        "CHART", "PUMP", "DIP", "ENTRY", "EXIT", "STOP", "LOSS", "PROFIT", "COIN", "TOKEN",
        "TRADE", "TOP", "LOW",
        // Stables aren't signals
        "USD", "USDT", "USDC", "BUSD", "DAI",
        // URL fragments and chat furniture
        "URL", "COM", "ORG", "NET", "HTTP", "HTTPS", "WWW", "PIN", "BOT", "VIA", "MSG", "DM",
        "CHAT", "ADMIN", "MOD",
    ]
    .into_iter()
    .collect()
});

// --- Token display names ---

pub fn known_token_name(symbol: &str) -> Option<&'static str> {
    let name = match symbol.to_ascii_uppercase().as_str() {
        "BTC" => "Bitcoin",
        "ETH" => "Ethereum",
        "SOL" => "Solana",
        "DOGE" => "Dogecoin",
        "PEPE" => "Pepe",
        "SHIB" => "Shiba Inu",
        "LINK" => "Chainlink",
        "MATIC" => "Polygon",
        "AVAX" => "Avalanche",
        "DOT" => "Polkadot",
        "ADA" => "Cardano",
        "XRP" => "Ripple",
        "BNB" => "Binance Coin",
        "ATOM" => "Cosmos",
        "UNI" => "Uniswap",
        "AAVE" => "Aave",
        "LTC" => "Litecoin",
        "FTM" => "Fantom",
        "NEAR" => "NEAR Protocol",
        "APT" => "Aptos",
        "ARB" => "Arbitrum",
        "OP" => "Optimism",
        "INJ" => "Injective",
        "SUI" => "Sui",
        "WIF" => "dogwifhat",
        "BONK" => "Bonk",
        "JUP" => "Jupiter",
        "WLD" => "Worldcoin",
        "TIA" => "Celestia",
        "SEI" => "Sei",
        "PYTH" => "Pyth Network",
        "ONDO" => "Ondo Finance",
        "RNDR" | "RENDER" => "Render",
        "FET" => "Fetch.ai",
        "TAO" => "Bittensor",
        "TON" => "Toncoin",
        "TRUMP" => "TRUMP",
        "BRETT" => "Brett",
        "MOG" => "Mog Coin",
        "POPCAT" => "Popcat",
        _ => return None,
    };
    Some(name)
}
