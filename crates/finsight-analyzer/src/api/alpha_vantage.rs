//! Alpha Vantage API client

use crate::api::QuoteSource;
use crate::config::MarketDataConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::{CompanyOverview, DataPoint, Quote};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const PROVIDER: &str = "Alpha Vantage";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Alpha Vantage API client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    config: MarketDataConfig,
    rate_limiter: SharedRateLimiter,
}

impl AlphaVantageClient {
    /// Create a client; requests are throttled to the configured per-minute limit
    pub fn new(config: MarketDataConfig) -> Result<Self> {
        let per_minute = NonZeroU32::new(config.rate_limit_per_minute).ok_or_else(|| {
            AnalyzerError::Config("market data rate limit must be greater than 0".to_string())
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Symbols tried, in order, for a requested symbol
    ///
    /// A bare symbol goes primary exchange, secondary exchange, then bare;
    /// a suffixed one is used as given.
    pub fn candidates(&self, symbol: &str) -> Vec<String> {
        if symbol.contains('.') {
            return vec![symbol.to_string()];
        }

        vec![
            format!("{symbol}{}", self.config.primary_exchange_suffix),
            format!("{symbol}{}", self.config.secondary_exchange_suffix),
            symbol.to_string(),
        ]
    }

    /// Quote with exchange fallback; failures end up in `error`
    #[instrument(skip(self))]
    pub async fn fetch_quote(&self, symbol: &str) -> Quote {
        match self.first_success(symbol, |s| async move { self.try_quote(&s).await }).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(symbol, error = %e, "quote unavailable on every exchange");
                Quote::unavailable(symbol, e.to_string())
            }
        }
    }

    /// Company overview with exchange fallback; failures end up in `error`
    #[instrument(skip(self))]
    pub async fn fetch_overview(&self, symbol: &str) -> CompanyOverview {
        match self.first_success(symbol, |s| async move { self.try_overview(&s).await }).await {
            Ok(overview) => overview,
            Err(e) => {
                warn!(symbol, error = %e, "overview unavailable on every exchange");
                CompanyOverview::unavailable(symbol, e.to_string())
            }
        }
    }

    /// Quote merged with company overview
    ///
    /// Both are fetched concurrently. A failed quote yields an error quote;
    /// a failed overview only leaves the company fields unavailable.
    #[instrument(skip(self))]
    pub async fn fetch_stock_data(&self, symbol: &str) -> Quote {
        let (quote, overview) = tokio::join!(self.fetch_quote(symbol), self.fetch_overview(symbol));

        if !quote.is_ok() {
            return quote;
        }
        if overview.error.is_some() {
            return quote;
        }
        quote.with_overview(overview)
    }

    /// One `GLOBAL_QUOTE` call, no fallback
    pub async fn try_quote(&self, symbol: &str) -> Result<Quote> {
        let data = self.call("GLOBAL_QUOTE", symbol).await?;

        let global_quote = data
            .get("Global Quote")
            .filter(|q| q.as_object().is_some_and(|o| !o.is_empty()))
            .ok_or_else(|| AnalyzerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "empty Global Quote".to_string(),
            })?;

        Ok(Quote {
            symbol: global_quote
                .get("01. symbol")
                .and_then(Value::as_str)
                .unwrap_or(symbol)
                .to_string(),
            price: DataPoint::from_json(global_quote, "05. price"),
            change: DataPoint::from_json(global_quote, "09. change"),
            change_percent: DataPoint::from_json(global_quote, "10. change percent"),
            previous_close: DataPoint::from_json(global_quote, "08. previous close"),
            timestamp: DataPoint::from_json(global_quote, "07. latest trading day"),
            ..Default::default()
        })
    }

    /// One `OVERVIEW` call, no fallback
    pub async fn try_overview(&self, symbol: &str) -> Result<CompanyOverview> {
        let data = self.call("OVERVIEW", symbol).await?;

        let resolved = data
            .get("Symbol")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AnalyzerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no company overview".to_string(),
            })?;

        Ok(CompanyOverview {
            symbol: resolved.to_string(),
            name: DataPoint::from_json(&data, "Name"),
            sector: DataPoint::from_json(&data, "Sector"),
            industry: DataPoint::from_json(&data, "Industry"),
            market_cap: DataPoint::from_json(&data, "MarketCapitalization"),
            pe_ratio: DataPoint::from_json(&data, "PERatio"),
            dividend_yield: DataPoint::from_json(&data, "DividendYield"),
            exchange: DataPoint::from_json(&data, "Exchange"),
            error: None,
        })
    }

    async fn first_success<T, F, Fut>(&self, symbol: &str, fetch: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for candidate in self.candidates(symbol) {
            match fetch(candidate.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(candidate = %candidate, error = %e, "attempt failed, trying next exchange");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AnalyzerError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "no candidate symbols".to_string(),
        }))
    }

    async fn call(&self, function: &str, symbol: &str) -> Result<Value> {
        // Quota waits count against the request timeout
        if tokio::time::timeout(self.config.request_timeout, self.rate_limiter.until_ready())
            .await
            .is_err()
        {
            warn!(function, symbol, "rate limiter wait timed out");
            return Err(AnalyzerError::RateLimited {
                provider: PROVIDER.to_string(),
            });
        }

        debug!(function, symbol, "requesting market data");
        let response = self
            .client
            .get(&self.config.api_base)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response.json().await?;

        // Check for API error messages
        if let Some(message) = data.get("Error Message") {
            return Err(AnalyzerError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: message.as_str().unwrap_or("error message").to_string(),
            });
        }

        if data.get("Note").is_some() || data.get("Information").is_some() {
            return Err(AnalyzerError::RateLimited {
                provider: PROVIDER.to_string(),
            });
        }

        Ok(data)
    }
}

#[async_trait]
impl QuoteSource for AlphaVantageClient {
    async fn fetch_stock_data(&self, symbol: &str) -> Quote {
        AlphaVantageClient::fetch_stock_data(self, symbol).await
    }
}
