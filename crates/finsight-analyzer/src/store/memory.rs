use super::{AnalysisStore, ensure_owner, new_record, newest_first};
use crate::error::Result;
use crate::models::{AnalysisResult, Context, StoredAnalysis};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process store; records live as long as the value
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredAnalysis>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn save(
        &self,
        user_id: &str,
        query: &str,
        context: Context,
        analysis: AnalysisResult,
    ) -> Result<StoredAnalysis> {
        let record = new_record(user_id, query, context, analysis);
        self.records.write().await.push(record.clone());
        debug!(id = %record.id, "analysis saved");
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredAnalysis>> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<StoredAnalysis>> {
        Ok(newest_first(self.records.read().await.iter(), user_id, limit))
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        ensure_owner(&records[index], user_id)?;
        records.remove(index);
        debug!(id, "analysis deleted");
        Ok(true)
    }
}
