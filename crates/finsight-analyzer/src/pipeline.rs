//! Query enrichment and analysis pipeline
//!
//! `run` goes query -> symbols -> {quotes, news} -> context -> analysis ->
//! stored record. Every external step degrades in place; only the store can
//! fail the call.

use crate::api::{AlphaVantageClient, NewsSource, QuoteSource, TavilyClient};
use crate::config::AnalyzerConfig;
use crate::engine::AnalysisEngine;
use crate::error::{AnalyzerError, Result};
use crate::models::{Context, Quote, StoredAnalysis, Symbol};
use crate::store::AnalysisStore;
use crate::symbols::extract_symbols;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Composes the providers, the engine and the store
pub struct AnalysisPipeline {
    news: Arc<dyn NewsSource>,
    quotes: Arc<dyn QuoteSource>,
    engine: Arc<AnalysisEngine>,
    store: Arc<dyn AnalysisStore>,
}

impl AnalysisPipeline {
    pub fn new(
        news: Arc<dyn NewsSource>,
        quotes: Arc<dyn QuoteSource>,
        engine: Arc<AnalysisEngine>,
        store: Arc<dyn AnalysisStore>,
    ) -> Self {
        Self {
            news,
            quotes,
            engine,
            store,
        }
    }

    /// Pipeline wired to the HTTP providers described by `config`
    pub fn from_config(config: &AnalyzerConfig, store: Arc<dyn AnalysisStore>) -> Result<Self> {
        let news = Arc::new(TavilyClient::new(config.news.clone())?);
        let quotes = Arc::new(AlphaVantageClient::new(config.market_data.clone())?);
        let engine = Arc::new(AnalysisEngine::from_config(&config.completion)?);

        Ok(Self::new(news, quotes, engine, store))
    }

    pub fn store(&self) -> &Arc<dyn AnalysisStore> {
        &self.store
    }

    /// Gather quotes and news for `query`.
    ///
    /// Quote fetches run concurrently with each other and with the news
    /// search; the context is assembled once all of them finish.
    #[instrument(skip(self))]
    pub async fn enrich(&self, query: &str) -> Context {
        let symbols = extract_symbols(query);
        debug!(?symbols, "symbols extracted");

        let (quotes, news) = tokio::join!(self.fetch_quotes(symbols), self.news.fetch_news(query));

        Context::assemble(query, news, quotes)
    }

    /// Analyze `query` for `user_id` and persist the result.
    ///
    /// Fails only with [`AnalyzerError::PersistenceUnavailable`].
    #[instrument(skip(self))]
    pub async fn run(&self, user_id: &str, query: &str) -> Result<StoredAnalysis> {
        let context = self.enrich(query).await;
        info!(
            quotes = context.quotes.len(),
            articles = context.articles.len(),
            has_quote_data = context.has_quote_data,
            "context assembled"
        );

        let analysis = self.engine.analyze(query, &context).await;

        let record = self
            .store
            .save(user_id, query, context, analysis)
            .await
            .map_err(|e| match e {
                AnalyzerError::PersistenceUnavailable(_) => e,
                other => AnalyzerError::PersistenceUnavailable(other.to_string()),
            })?;

        info!(id = %record.id, degraded = record.is_degraded(), "analysis stored");
        Ok(record)
    }

    async fn fetch_quotes(&self, symbols: impl IntoIterator<Item = Symbol>) -> BTreeMap<Symbol, Quote> {
        let fetches = symbols.into_iter().map(|symbol| async move {
            let quote = self.quotes.fetch_stock_data(&symbol).await;
            (symbol, quote)
        });

        join_all(fetches).await.into_iter().collect()
    }
}
