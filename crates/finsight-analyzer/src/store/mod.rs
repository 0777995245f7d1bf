//! Persistence of analyses, keyed by owning user

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::{AnalyzerError, Result};
use crate::models::{AnalysisResult, Context, StoredAnalysis};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

/// Storage collaborator for analysis records
///
/// Reads and deletes respect ownership: a record is only visible to the
/// user that created it.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persist a new record and return it with its assigned id
    async fn save(
        &self,
        user_id: &str,
        query: &str,
        context: Context,
        analysis: AnalysisResult,
    ) -> Result<StoredAnalysis>;

    /// Look up a record regardless of owner
    async fn get_by_id(&self, id: &str) -> Result<Option<StoredAnalysis>>;

    /// Records owned by `user_id`, most recent first, at most `limit`
    async fn list_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<StoredAnalysis>>;

    /// Hard-delete a record.
    ///
    /// Returns `Ok(false)` when no record has this id and
    /// [`AnalyzerError::Forbidden`] when it belongs to someone else.
    async fn delete(&self, id: &str, user_id: &str) -> Result<bool>;

    /// Ownership-checked read
    async fn get_for_user(&self, id: &str, user_id: &str) -> Result<StoredAnalysis> {
        let record = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| AnalyzerError::NotFound(id.to_string()))?;
        ensure_owner(&record, user_id)?;
        Ok(record)
    }
}

/// Fresh record with a UUID v4 id
pub(crate) fn new_record(
    user_id: &str,
    query: &str,
    context: Context,
    analysis: AnalysisResult,
) -> StoredAnalysis {
    StoredAnalysis {
        id: Uuid::new_v4().to_string(),
        owner_user_id: user_id.to_string(),
        query: query.to_string(),
        context,
        analysis,
        created_at: Utc::now(),
    }
}

pub(crate) fn ensure_owner(record: &StoredAnalysis, user_id: &str) -> Result<()> {
    if record.owner_user_id == user_id {
        Ok(())
    } else {
        Err(AnalyzerError::Forbidden {
            id: record.id.clone(),
            user_id: user_id.to_string(),
        })
    }
}

/// Most recent first; ties keep the later-inserted record first
pub(crate) fn newest_first<'a>(
    records: impl DoubleEndedIterator<Item = &'a StoredAnalysis>,
    user_id: &str,
    limit: usize,
) -> Vec<StoredAnalysis> {
    let mut owned: Vec<StoredAnalysis> = records
        .rev()
        .filter(|r| r.owner_user_id == user_id)
        .cloned()
        .collect();
    owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    owned.truncate(limit);
    owned
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{AnalysisResult, Context, NewsBundle};
    use chrono::Utc;
    use std::collections::BTreeMap;

    pub fn context(query: &str) -> Context {
        Context::assemble(query, NewsBundle::unavailable(), BTreeMap::new())
    }

    pub fn analysis(query: &str) -> AnalysisResult {
        AnalysisResult {
            analysis_text: format!("analysis of {query}"),
            query: query.to_string(),
            model_name: "test-model".to_string(),
            created_at: Utc::now(),
            error: None,
        }
    }
}
