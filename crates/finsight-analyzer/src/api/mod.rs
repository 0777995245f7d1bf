//! API clients for news and market data providers

pub mod alpha_vantage;
pub mod tavily;

pub use alpha_vantage::AlphaVantageClient;
pub use tavily::TavilyClient;

use crate::models::{NewsBundle, Quote};
use async_trait::async_trait;

/// Source of news context for a query
///
/// Implementations absorb their own failures and return
/// [`NewsBundle::unavailable`] instead of an error.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_news(&self, query: &str) -> NewsBundle;
}

/// Source of price and company data for a symbol
///
/// Implementations never fail; a symbol without data comes back as a
/// [`Quote`] with `error` set.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_stock_data(&self, symbol: &str) -> Quote;
}
