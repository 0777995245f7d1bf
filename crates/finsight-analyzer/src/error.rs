//! Error types for the analysis pipeline

use thiserror::Error;

/// Errors raised inside the pipeline's components
///
/// Provider-level variants (`Transport`, `Upstream`, `DataUnavailable`,
/// `RateLimited`) never leave their component: the news, quote and analysis
/// providers turn them into degraded values. `PersistenceUnavailable` is the
/// only one [`crate::AnalysisPipeline::run`] surfaces.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Timeout or connection failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Well-formed response lacking the expected fields
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Provider signalled its request quota was exhausted
    #[error("Rate limit exceeded for {provider}")]
    RateLimited { provider: String },

    /// Storage collaborator could not be reached or failed to persist
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// No stored analysis with this id
    #[error("Analysis {0} not found")]
    NotFound(String),

    /// Stored analysis belongs to another user
    #[error("Analysis {id} is not owned by {user_id}")]
    Forbidden { id: String, user_id: String },

    /// Query rejected before entering the pipeline
    #[error("Invalid query: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prompt template failed to render
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Result type alias for analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

impl AnalyzerError {
    /// Whether the error came from the HTTP layer and a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Upstream { .. } | Self::RateLimited { .. }
        )
    }
}

impl From<finsight_utils::EnvError> for AnalyzerError {
    fn from(err: finsight_utils::EnvError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalyzerError::Upstream {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream error 503: maintenance");

        let err = AnalyzerError::DataUnavailable {
            symbol: "INFY".to_string(),
            reason: "empty Global Quote".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for INFY: empty Global Quote");
    }

    #[test]
    fn test_transient_classification() {
        assert!(AnalyzerError::Upstream { status: 500, body: String::new() }.is_transient());
        assert!(
            AnalyzerError::RateLimited {
                provider: "Alpha Vantage".to_string()
            }
            .is_transient()
        );
        assert!(!AnalyzerError::NotFound("x".to_string()).is_transient());
        assert!(!AnalyzerError::PersistenceUnavailable("disk full".to_string()).is_transient());
    }

    #[test]
    fn test_env_error_conversion() {
        let err: AnalyzerError = finsight_utils::EnvError::Missing("TAVILY_API_KEY".to_string()).into();
        assert!(matches!(err, AnalyzerError::Config(ref msg) if msg.contains("TAVILY_API_KEY")));
    }
}
