//! Records flowing through the pipeline
//!
//! Everything here is a plain value: built once by a provider or the
//! pipeline, then handed on by value and finally persisted verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Marker stored in place of a value the upstream did not provide
pub const UNAVAILABLE: &str = "unavailable";

/// Ticker symbol, uppercase, optionally with an exchange suffix (`INFY.NSE`)
pub type Symbol = String;

/// A single market-data field that may be missing
///
/// Serializes as a plain string; a missing value is written as
/// `"unavailable"` so stored records always have the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum DataPoint {
    #[default]
    Unavailable,
    Value(String),
}

impl DataPoint {
    /// Wrap a raw upstream value, mapping placeholder strings to `Unavailable`
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match raw.trim() {
            "" | "None" | "none" | "N/A" | "-" | UNAVAILABLE => Self::Unavailable,
            trimmed => Self::Value(trimmed.to_string()),
        }
    }

    /// Read a string field out of a JSON object
    pub fn from_json(value: &serde_json::Value, key: &str) -> Self {
        match value.get(key) {
            Some(serde_json::Value::String(s)) => Self::new(s.as_str()),
            Some(serde_json::Value::Number(n)) => Self::Value(n.to_string()),
            _ => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// The value, or `"unavailable"`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(v) => v,
            Self::Unavailable => UNAVAILABLE,
        }
    }

    /// The value, or the given marker when missing
    pub fn or_marker<'a>(&'a self, marker: &'a str) -> &'a str {
        match self {
            Self::Value(v) => v,
            Self::Unavailable => marker,
        }
    }

    /// Keep `self` when present, otherwise take `other`
    pub fn or(self, other: Self) -> Self {
        if self.is_available() { self } else { other }
    }
}

impl From<Option<String>> for DataPoint {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Unavailable, Self::new)
    }
}

impl From<DataPoint> for String {
    fn from(value: DataPoint) -> Self {
        match value {
            DataPoint::Value(v) => v,
            DataPoint::Unavailable => UNAVAILABLE.to_string(),
        }
    }
}

impl From<&str> for DataPoint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A news article returned by the search provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub content: String,
    pub published_date: String,
    pub source: String,
}

/// Result of one news search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsBundle {
    pub articles: Vec<Article>,
    pub summary: String,
}

impl NewsBundle {
    /// Empty result used when every attempt failed
    pub fn unavailable() -> Self {
        Self {
            articles: Vec::new(),
            summary: UNAVAILABLE.to_string(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.articles.is_empty() && self.summary == UNAVAILABLE
    }
}

/// Company metadata from the market-data provider
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompanyOverview {
    pub symbol: Symbol,
    pub name: DataPoint,
    pub sector: DataPoint,
    pub industry: DataPoint,
    pub market_cap: DataPoint,
    pub pe_ratio: DataPoint,
    pub dividend_yield: DataPoint,
    pub exchange: DataPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompanyOverview {
    /// Overview with every field unavailable and `error` set
    pub fn unavailable(symbol: impl Into<Symbol>, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Price and fundamentals for one symbol
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: DataPoint,
    pub change: DataPoint,
    pub change_percent: DataPoint,
    pub previous_close: DataPoint,
    pub timestamp: DataPoint,
    pub name: DataPoint,
    pub sector: DataPoint,
    pub industry: DataPoint,
    pub market_cap: DataPoint,
    pub pe_ratio: DataPoint,
    pub dividend_yield: DataPoint,
    pub exchange: DataPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Quote {
    /// Quote with every field unavailable and `error` set
    pub fn unavailable(symbol: impl Into<Symbol>, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// True when the quote carries data rather than an error
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Merge company metadata into this quote.
    ///
    /// The overview wins for company fields; price fields stay as quoted.
    pub fn with_overview(mut self, overview: CompanyOverview) -> Self {
        self.name = overview.name.or(self.name);
        self.sector = overview.sector.or(self.sector);
        self.industry = overview.industry.or(self.industry);
        self.market_cap = overview.market_cap.or(self.market_cap);
        self.pe_ratio = overview.pe_ratio.or(self.pe_ratio);
        self.dividend_yield = overview.dividend_yield.or(self.dividend_yield);
        self.exchange = overview.exchange.or(self.exchange);
        self
    }
}

/// Everything gathered for one query before the model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub news_summary: String,
    pub articles: Vec<Article>,
    pub query_time: DateTime<Utc>,
    pub query: String,
    pub quotes: BTreeMap<Symbol, Quote>,
    pub has_quote_data: bool,
}

impl Context {
    /// Merge news and quotes for `query`
    pub fn assemble(query: impl Into<String>, news: NewsBundle, quotes: BTreeMap<Symbol, Quote>) -> Self {
        let has_quote_data = quotes.values().any(Quote::is_ok);
        Self {
            news_summary: news.summary,
            articles: news.articles,
            query_time: Utc::now(),
            query: query.into(),
            quotes,
            has_quote_data,
        }
    }

    /// Quotes without an error, in symbol order
    pub fn usable_quotes(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.values().filter(|q| q.is_ok())
    }
}

/// Model output for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_text: String,
    pub query: String,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// A persisted analysis, owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: String,
    pub owner_user_id: String,
    pub query: String,
    pub context: Context,
    pub analysis: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

impl StoredAnalysis {
    /// True if any external call behind this record degraded
    pub fn is_degraded(&self) -> bool {
        self.analysis.is_degraded()
            || self.context.quotes.values().any(|q| !q.is_ok())
            || self.context.news_summary == UNAVAILABLE
    }

    /// One-line listing entry
    pub fn summary(&self) -> String {
        const MAX_QUERY_CHARS: usize = 60;

        let mut query: String = self.query.chars().take(MAX_QUERY_CHARS).collect();
        if self.query.chars().count() > MAX_QUERY_CHARS {
            query.push_str("...");
        }

        format!(
            "{}  {}  {}{}",
            self.id,
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            query,
            if self.is_degraded() { "  [degraded]" } else { "" }
        )
    }
}
