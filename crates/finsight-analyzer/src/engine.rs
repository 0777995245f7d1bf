//! Analysis engine: one completion call per query

use crate::config::CompletionConfig;
use crate::error::{AnalyzerError, Result};
use crate::models::{AnalysisResult, Context};
use crate::prompts::{PromptBuilder, SYSTEM_PERSONA};
use chrono::Utc;
use finsight_llm::providers::{OpenAIConfig, OpenAIProvider};
use finsight_llm::{CompletionRequest, LLMError, LLMProvider, Message};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Shown to the user when the completion call fails
pub const FALLBACK_ANALYSIS: &str =
    "Unable to analyze the financial query at this time. Please try again later.";

/// Sends built prompts to a chat-completion provider
pub struct AnalysisEngine {
    provider: Arc<dyn LLMProvider>,
    prompts: PromptBuilder,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl AnalysisEngine {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &CompletionConfig) -> Result<Self> {
        Ok(Self {
            provider,
            prompts: PromptBuilder::new()?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Engine backed by the OpenAI-compatible HTTP provider
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let provider = OpenAIProvider::with_config(
            OpenAIConfig::groq(config.api_key.clone())
                .with_api_base(config.api_base.clone())
                .with_timeout(config.request_timeout),
        )
        .map_err(|e| AnalyzerError::Config(e.to_string()))?;

        Self::new(Arc::new(provider), config)
    }

    /// Analyze `query` against `context`
    ///
    /// Single attempt. Any provider failure yields a degraded result with
    /// `error` set rather than an error.
    #[instrument(skip(self, context), fields(provider = self.provider.name(), model = %self.model))]
    pub async fn analyze(&self, query: &str, context: &Context) -> AnalysisResult {
        let prompt = self.prompts.build(query, context);

        let request = CompletionRequest::builder(&self.model)
            .system(SYSTEM_PERSONA)
            .add_message(Message::user(prompt))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build();

        let outcome = self.provider.complete(request).await.and_then(|response| {
            response
                .message
                .text()
                .map(ToString::to_string)
                .ok_or_else(|| LLMError::UnexpectedResponse("empty completion".to_string()))
        });

        match outcome {
            Ok(text) => {
                info!(chars = text.len(), "analysis completed");
                AnalysisResult {
                    analysis_text: text,
                    query: query.to_string(),
                    model_name: self.model.clone(),
                    created_at: Utc::now(),
                    error: None,
                }
            }
            Err(e) => {
                error!(error = %e, "completion failed, returning degraded analysis");
                AnalysisResult {
                    analysis_text: FALLBACK_ANALYSIS.to_string(),
                    query: query.to_string(),
                    model_name: self.model.clone(),
                    created_at: Utc::now(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
