//! Tavily search client for financial news
//!
//! Every failure is absorbed here: callers always get a [`NewsBundle`],
//! possibly the empty "unavailable" one.

use crate::api::NewsSource;
use crate::config::NewsConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::{Article, NewsBundle};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Tavily search API client
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: Client,
    config: NewsConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
    answer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
    published_date: Option<String>,
    source: Option<String>,
}

impl From<SearchResult> for Article {
    fn from(result: SearchResult) -> Self {
        Self {
            title: result.title.unwrap_or_else(|| "No title".to_string()),
            url: result.url.unwrap_or_default(),
            content: result
                .content
                .unwrap_or_else(|| "No content available".to_string()),
            published_date: result.published_date.unwrap_or_else(|| "unknown".to_string()),
            source: result.source.unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

impl TavilyClient {
    pub fn new(config: NewsConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    /// Search with the configured result count and retry budget
    pub async fn fetch_news(&self, query: &str) -> NewsBundle {
        self.fetch_news_with(query, self.config.max_results, self.config.max_retries)
            .await
    }

    /// Search news for `query`, retrying with exponential backoff.
    ///
    /// At most `max_retries` requests are sent. After the `n`th failure the
    /// client waits `base * 2^n`, except for the first 404, which is followed
    /// by a single `base` wait and a request without the domain allow-list.
    /// Errors that are not transient end the search immediately.
    #[instrument(skip(self))]
    pub async fn fetch_news_with(&self, query: &str, max_results: u32, max_retries: u32) -> NewsBundle {
        let attempts = max_retries.max(1);
        let mut narrowed = false;

        for attempt in 1..=attempts {
            debug!(attempt, narrowed, "searching news");

            let err = match self.search(query, max_results, !narrowed).await {
                Ok(bundle) => {
                    info!(articles = bundle.articles.len(), attempt, "news search succeeded");
                    return bundle;
                }
                Err(e) => e,
            };

            if attempt == attempts {
                error!(attempts, error = %err, "news search exhausted retries");
                break;
            }
            if !err.is_transient() {
                error!(attempt, error = %err, "news search failed permanently");
                break;
            }

            let wait = if is_not_found(&err) && !narrowed {
                narrowed = true;
                self.config.retry_backoff_base
            } else {
                self.config.retry_backoff(attempt)
            };

            warn!(attempt, error = %err, wait_ms = duration_ms(wait), "news search failed, retrying");
            tokio::time::sleep(wait).await;
        }

        NewsBundle::unavailable()
    }

    async fn search(&self, query: &str, max_results: u32, with_domains: bool) -> Result<NewsBundle> {
        let mut body = json!({
            "query": format!("Latest Indian financial news about {query}, focus on stock market impact"),
            "search_depth": "advanced",
            "max_results": max_results,
            "include_answer": true,
            "include_images": false,
            "include_raw_content": false,
        });
        if with_domains {
            body["include_domains"] = json!(self.config.include_domains);
        }

        let url = format!("{}/search", self.config.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
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

        let data: SearchResponse = response.json().await?;

        Ok(NewsBundle {
            articles: data.results.into_iter().map(Article::from).collect(),
            summary: data
                .answer
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "No summary available".to_string()),
        })
    }
}

#[async_trait]
impl NewsSource for TavilyClient {
    async fn fetch_news(&self, query: &str) -> NewsBundle {
        TavilyClient::fetch_news(self, query).await
    }
}

fn is_not_found(err: &AnalyzerError) -> bool {
    matches!(err, AnalyzerError::Upstream { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
