//! Configuration for the analysis pipeline

use crate::error::{AnalyzerError, Result};
use finsight_utils::{env_opt, env_parse};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tavily search endpoint
pub const DEFAULT_TAVILY_API_BASE: &str = "https://api.tavily.com";
/// Alpha Vantage query endpoint
pub const DEFAULT_ALPHA_VANTAGE_API_BASE: &str = "https://www.alphavantage.co/query";
/// Groq's OpenAI-compatible endpoint
pub const DEFAULT_COMPLETION_API_BASE: &str = finsight_llm::providers::openai::DEFAULT_GROQ_API_BASE;
/// Model used for analysis unless overridden
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Financial news sites the search is scoped to
pub const FINANCIAL_NEWS_DOMAINS: &[&str] = &[
    "economictimes.indiatimes.com",
    "moneycontrol.com",
    "livemint.com",
    "financialexpress.com",
    "business-standard.com",
    "ndtv.com/business",
    "cnbctv18.com",
    "reuters.com",
    "bloomberg.com",
];

/// News search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Search API key
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Search API base URL (the client appends `/search`)
    pub api_base: String,

    /// Articles requested per search
    pub max_results: u32,

    /// Total attempts before giving up
    pub max_retries: u32,

    /// Base wait between attempts; attempt `n` waits `base * 2^n`
    pub retry_backoff_base: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Domain allow-list sent with the first request
    pub include_domains: Vec<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_TAVILY_API_BASE.to_string(),
            max_results: 5,
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(20),
            include_domains: FINANCIAL_NEWS_DOMAINS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl NewsConfig {
    /// Wait before the attempt following `failed_attempts` failures
    pub fn retry_backoff(&self, failed_attempts: u32) -> Duration {
        self.retry_backoff_base * 2_u32.saturating_pow(failed_attempts)
    }
}

/// Market data settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Market-data API key
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Market-data API base URL
    pub api_base: String,

    /// Requests per minute allowed by the API plan
    pub rate_limit_per_minute: u32,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Suffix tried first for symbols without one
    pub primary_exchange_suffix: String,

    /// Suffix tried second for symbols without one
    pub secondary_exchange_suffix: String,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_ALPHA_VANTAGE_API_BASE.to_string(),
            rate_limit_per_minute: 30,
            request_timeout: Duration::from_secs(15),
            primary_exchange_suffix: ".NSE".to_string(),
            secondary_exchange_suffix: ".BSE".to_string(),
        }
    }
}

/// Completion API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Completion API key
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// OpenAI-compatible base URL
    pub api_base: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Output length bound
    pub max_tokens: usize,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_COMPLETION_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: 2000,
            request_timeout: Duration::from_secs(20),
        }
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub news: NewsConfig,
    pub market_data: MarketDataConfig,
    pub completion: CompletionConfig,

    /// Default number of records returned by history listings
    pub history_limit: usize,

    /// Longest query accepted by the validation layer
    pub max_query_length: usize,
}

/// Shortest query accepted by the validation layer (after trimming)
pub const MIN_QUERY_LENGTH: usize = 5;

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            news: NewsConfig::default(),
            market_data: MarketDataConfig::default(),
            completion: CompletionConfig::default(),
            history_limit: 10,
            max_query_length: 500,
        }
    }
}

impl AnalyzerConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::default()
    }

    /// Build a configuration from the process environment
    ///
    /// Unset variables keep their defaults; API keys stay empty and are
    /// checked separately by [`AnalyzerConfig::require_credentials`].
    pub fn from_env() -> Result<Self> {
        let mut config = Self::builder().build()?;

        if let Some(key) = env_opt("TAVILY_API_KEY") {
            config.news.api_key = key;
        }
        if let Some(base) = env_opt("TAVILY_API_BASE") {
            config.news.api_base = base;
        }
        if let Some(key) = env_opt("ALPHA_VANTAGE_API_KEY") {
            config.market_data.api_key = key;
        }
        if let Some(base) = env_opt("ALPHA_VANTAGE_API_BASE") {
            config.market_data.api_base = base;
        }
        if let Some(limit) = env_parse::<u32>("ALPHA_VANTAGE_RATE_LIMIT")? {
            config.market_data.rate_limit_per_minute = limit;
        }
        if let Some(key) = env_opt("GROQ_API_KEY") {
            config.completion.api_key = key;
        }
        if let Some(base) = env_opt("GROQ_API_BASE") {
            config.completion.api_base = base;
        }
        if let Some(model) = env_opt("GROQ_MODEL") {
            config.completion.model = model;
        }
        if let Some(secs) = env_parse::<u64>("FINSIGHT_REQUEST_TIMEOUT_SECS")? {
            config.set_request_timeout(Duration::from_secs(secs));
        }
        if let Some(limit) = env_parse::<usize>("FINSIGHT_HISTORY_LIMIT")? {
            config.history_limit = limit;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply one timeout to every outbound call
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.news.request_timeout = timeout;
        self.market_data.request_timeout = timeout;
        self.completion.request_timeout = timeout;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.news.max_retries == 0 {
            return Err(AnalyzerError::Config(
                "news max_retries must be greater than 0".to_string(),
            ));
        }

        if self.news.max_results == 0 {
            return Err(AnalyzerError::Config(
                "news max_results must be greater than 0".to_string(),
            ));
        }

        if self.market_data.rate_limit_per_minute == 0 {
            return Err(AnalyzerError::Config(
                "market data rate limit must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(AnalyzerError::Config(format!(
                "temperature {} outside 0.0..=2.0",
                self.completion.temperature
            )));
        }

        if self.completion.model.trim().is_empty() {
            return Err(AnalyzerError::Config("model must not be empty".to_string()));
        }

        if self.max_query_length < MIN_QUERY_LENGTH {
            return Err(AnalyzerError::Config(format!(
                "max_query_length must be at least {MIN_QUERY_LENGTH}"
            )));
        }

        Ok(())
    }

    /// Ensure every external API has a key
    pub fn require_credentials(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("TAVILY_API_KEY", &self.news.api_key),
            ("ALPHA_VANTAGE_API_KEY", &self.market_data.api_key),
            ("GROQ_API_KEY", &self.completion.api_key),
        ]
        .into_iter()
        .filter(|(_, key)| key.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalyzerError::Config(format!(
                "missing API keys: {}",
                missing.join(", ")
            )))
        }
    }

    /// Reject queries outside the accepted length range.
    ///
    /// This is the input-validation layer that sits in front of the pipeline;
    /// the pipeline itself assumes a valid query.
    pub fn validate_query<'q>(&self, query: &'q str) -> Result<&'q str> {
        let trimmed = query.trim();
        let len = trimmed.chars().count();

        if len < MIN_QUERY_LENGTH {
            return Err(AnalyzerError::Validation(format!(
                "query must be at least {MIN_QUERY_LENGTH} characters"
            )));
        }
        if len > self.max_query_length {
            return Err(AnalyzerError::Validation(format!(
                "query must be at most {} characters",
                self.max_query_length
            )));
        }

        Ok(trimmed)
    }
}

/// Builder for AnalyzerConfig
#[derive(Debug, Default)]
pub struct AnalyzerConfigBuilder {
    news: Option<NewsConfig>,
    market_data: Option<MarketDataConfig>,
    completion: Option<CompletionConfig>,
    history_limit: Option<usize>,
    max_query_length: Option<usize>,
}

impl AnalyzerConfigBuilder {
    /// Set news search settings
    pub fn news(mut self, news: NewsConfig) -> Self {
        self.news = Some(news);
        self
    }

    /// Set market data settings
    pub fn market_data(mut self, market_data: MarketDataConfig) -> Self {
        self.market_data = Some(market_data);
        self
    }

    /// Set completion API settings
    pub fn completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Set default history page size
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Set the longest accepted query
    pub fn max_query_length(mut self, len: usize) -> Self {
        self.max_query_length = Some(len);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalyzerConfig> {
        let defaults = AnalyzerConfig::default();

        let config = AnalyzerConfig {
            news: self.news.unwrap_or(defaults.news),
            market_data: self.market_data.unwrap_or(defaults.market_data),
            completion: self.completion.unwrap_or(defaults.completion),
            history_limit: self.history_limit.unwrap_or(defaults.history_limit),
            max_query_length: self.max_query_length.unwrap_or(defaults.max_query_length),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::builder().build().unwrap();
        assert_eq!(config.news.max_results, 5);
        assert_eq!(config.news.max_retries, 3);
        assert_eq!(config.news.include_domains.len(), FINANCIAL_NEWS_DOMAINS.len());
        assert_eq!(config.market_data.primary_exchange_suffix, ".NSE");
        assert_eq!(config.market_data.secondary_exchange_suffix, ".BSE");
        assert_eq!(config.completion.model, DEFAULT_MODEL);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.max_query_length, 500);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let result = AnalyzerConfig::builder()
            .news(NewsConfig {
                max_retries: 0,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(AnalyzerError::Config(_))));
    }

    #[test]
    fn test_temperature_bounds() {
        let result = AnalyzerConfig::builder()
            .completion(CompletionConfig {
                temperature: 3.0,
                ..Default::default()
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_request_timeout_applies_to_every_call() {
        let mut config = AnalyzerConfig::default();
        assert_eq!(config.completion.request_timeout, Duration::from_secs(20));

        config.set_request_timeout(Duration::from_millis(1500));

        assert_eq!(config.news.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.market_data.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.completion.request_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_retry_backoff() {
        let news = NewsConfig::default();
        assert_eq!(news.retry_backoff(0), Duration::from_secs(1));
        assert_eq!(news.retry_backoff(1), Duration::from_secs(2));
        assert_eq!(news.retry_backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_require_credentials_lists_missing() {
        let mut config = AnalyzerConfig::builder().build().unwrap();
        config.news.api_key = "tvly-key".to_string();

        let err = config.require_credentials().unwrap_err().to_string();
        assert!(err.contains("ALPHA_VANTAGE_API_KEY"));
        assert!(err.contains("GROQ_API_KEY"));
        assert!(!err.contains("TAVILY_API_KEY"));
    }

    #[test]
    fn test_validate_query() {
        let config = AnalyzerConfig::builder().max_query_length(20).build().unwrap();

        assert!(matches!(config.validate_query("  abc  "), Err(AnalyzerError::Validation(_))));
        assert_eq!(config.validate_query("  INFY news  ").unwrap(), "INFY news");
        assert!(config.validate_query(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_api_keys_not_serialized() {
        let mut config = AnalyzerConfig::builder().build().unwrap();
        config.completion.api_key = "gsk-secret".to_string();

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("gsk-secret"));
    }
}
