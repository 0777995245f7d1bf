//! Financial query enrichment and analysis
//!
//! This crate turns a free-text financial question into a stored analysis:
//!
//! - Ticker symbol extraction from the query (curated table plus regex)
//! - Market data per symbol from Alpha Vantage, with NSE/BSE fallback
//! - News context from Tavily search, with retry and backoff
//! - Prompt construction and a single chat-completion call
//! - Persistence of the result per user
//!
//! External failures never abort a run; they show up as `"unavailable"`
//! markers or an `error` field on the stored record. Only an unreachable
//! store fails [`AnalysisPipeline::run`].
//!
//! # Example
//!
//! ```rust,ignore
//! use finsight_analyzer::{AnalysisPipeline, AnalyzerConfig, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AnalyzerConfig::from_env()?;
//!     config.require_credentials()?;
//!
//!     let pipeline = AnalysisPipeline::from_config(&config, Arc::new(MemoryStore::new()))?;
//!     let record = pipeline.run("alice", "Will Infosys stock rise this quarter?").await?;
//!     println!("{}", record.analysis.analysis_text);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod store;
pub mod symbols;

// Re-export main types for convenience
pub use api::{AlphaVantageClient, NewsSource, QuoteSource, TavilyClient};
pub use config::{AnalyzerConfig, CompletionConfig, MarketDataConfig, NewsConfig};
pub use engine::AnalysisEngine;
pub use error::{AnalyzerError, Result};
pub use models::{
    AnalysisResult, Article, CompanyOverview, Context, DataPoint, NewsBundle, Quote,
    StoredAnalysis, Symbol,
};
pub use pipeline::AnalysisPipeline;
pub use prompts::PromptBuilder;
pub use store::{AnalysisStore, JsonFileStore, MemoryStore};
pub use symbols::extract_symbols;
