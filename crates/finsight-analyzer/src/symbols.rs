//! Ticker symbol extraction from free-text queries
//!
//! Over-inclusive by design: every table hit and every all-caps token is
//! returned. Callers get a set, so ordering and duplicates never matter.

use crate::models::Symbol;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Curated table of `(name, ticker)` pairs.
///
/// Names are uppercase and matched on whole tokens, so multi-word company
/// names work (`TATA MOTORS`) while short tickers don't fire inside words.
pub const KNOWN_SYMBOLS: &[(&str, &str)] = &[
    // NSE tickers
    ("ADANIENT", "ADANIENT"),
    ("ADANIPORTS", "ADANIPORTS"),
    ("ASIANPAINT", "ASIANPAINT"),
    ("AXISBANK", "AXISBANK"),
    ("BAJFINANCE", "BAJFINANCE"),
    ("BHARTIARTL", "BHARTIARTL"),
    ("BPCL", "BPCL"),
    ("CIPLA", "CIPLA"),
    ("COALINDIA", "COALINDIA"),
    ("DRREDDY", "DRREDDY"),
    ("HCLTECH", "HCLTECH"),
    ("HDFCBANK", "HDFCBANK"),
    ("HINDUNILVR", "HINDUNILVR"),
    ("ICICIBANK", "ICICIBANK"),
    ("INFY", "INFY"),
    ("ITC", "ITC"),
    ("JSWSTEEL", "JSWSTEEL"),
    ("KOTAKBANK", "KOTAKBANK"),
    ("LT", "LT"),
    ("MARUTI", "MARUTI"),
    ("NESTLEIND", "NESTLEIND"),
    ("NTPC", "NTPC"),
    ("ONGC", "ONGC"),
    ("POWERGRID", "POWERGRID"),
    ("RELIANCE", "RELIANCE"),
    ("SBIN", "SBIN"),
    ("SUNPHARMA", "SUNPHARMA"),
    ("TATAMOTORS", "TATAMOTORS"),
    ("TATASTEEL", "TATASTEEL"),
    ("TCS", "TCS"),
    ("TECHM", "TECHM"),
    ("TITAN", "TITAN"),
    ("ULTRACEMCO", "ULTRACEMCO"),
    ("WIPRO", "WIPRO"),
    // Company names
    ("ADANI ENTERPRISES", "ADANIENT"),
    ("ADANI PORTS", "ADANIPORTS"),
    ("ASIAN PAINTS", "ASIANPAINT"),
    ("AXIS BANK", "AXISBANK"),
    ("BAJAJ FINANCE", "BAJFINANCE"),
    ("BHARTI AIRTEL", "BHARTIARTL"),
    ("AIRTEL", "BHARTIARTL"),
    ("COAL INDIA", "COALINDIA"),
    ("DR REDDY", "DRREDDY"),
    ("HCL TECHNOLOGIES", "HCLTECH"),
    ("HDFC BANK", "HDFCBANK"),
    ("HINDUSTAN UNILEVER", "HINDUNILVR"),
    ("ICICI BANK", "ICICIBANK"),
    ("INFOSYS", "INFY"),
    ("KOTAK MAHINDRA BANK", "KOTAKBANK"),
    ("LARSEN", "LT"),
    ("MARUTI SUZUKI", "MARUTI"),
    ("NESTLE INDIA", "NESTLEIND"),
    ("STATE BANK OF INDIA", "SBIN"),
    ("SUN PHARMA", "SUNPHARMA"),
    ("TATA CONSULTANCY SERVICES", "TCS"),
    ("TATA MOTORS", "TATAMOTORS"),
    ("TATA STEEL", "TATASTEEL"),
    ("TECH MAHINDRA", "TECHM"),
    ("ULTRATECH CEMENT", "ULTRACEMCO"),
];

/// All-caps tokens, optionally exchange-suffixed
static TICKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]{2,10}(?:\.(?:NSE|BSE|NS|BO))?\b").expect("ticker pattern is valid")
});

/// Extract every recognised symbol from `query`
pub fn extract_symbols(query: &str) -> BTreeSet<Symbol> {
    let mut symbols = BTreeSet::new();

    let haystack = token_haystack(query);
    for (name, ticker) in KNOWN_SYMBOLS {
        if haystack.contains(&format!(" {name} ")) {
            symbols.insert((*ticker).to_string());
        }
    }

    for m in TICKER_PATTERN.find_iter(query) {
        symbols.insert(m.as_str().to_string());
    }

    symbols
}

/// Uppercased query reduced to space-separated tokens, padded on both ends
fn token_haystack(query: &str) -> String {
    let upper = query.to_uppercase();
    let tokens: Vec<&str> = upper
        .split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .collect();

    format!(" {} ", tokens.join(" "))
}
