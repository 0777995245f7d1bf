use super::{AnalysisStore, ensure_owner, new_record, newest_first};
use crate::error::{AnalyzerError, Result};
use crate::models::{AnalysisResult, Context, StoredAnalysis};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Store backed by a single JSON file
///
/// The file holds an array of records. Every write replaces it through a
/// temp file and rename, so a crash never leaves a half-written store.
/// Writers within one process are serialised by a mutex.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<StoredAnalysis>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AnalyzerError::PersistenceUnavailable(format!(
                    "corrupt store {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error("read", &e)),
        }
    }

    async fn persist(&self, records: &[StoredAnalysis]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error("create directory for", &e))?;
        }

        let data = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| self.io_error("write", &e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error("replace", &e))?;

        debug!(path = %self.path.display(), records = records.len(), "store written");
        Ok(())
    }

    fn io_error(&self, action: &str, err: &std::io::Error) -> AnalyzerError {
        AnalyzerError::PersistenceUnavailable(format!(
            "failed to {action} {}: {err}",
            self.path.display()
        ))
    }
}

#[async_trait]
impl AnalysisStore for JsonFileStore {
    #[instrument(skip(self, context, analysis))]
    async fn save(
        &self,
        user_id: &str,
        query: &str,
        context: Context,
        analysis: AnalysisResult,
    ) -> Result<StoredAnalysis> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        let record = new_record(user_id, query, context, analysis);
        records.push(record.clone());
        self.persist(&records).await?;

        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredAnalysis>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().find(|r| r.id == id))
    }

    async fn list_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<StoredAnalysis>> {
        let _guard = self.lock.lock().await;
        let records = self.load().await?;
        Ok(newest_first(records.iter(), user_id, limit))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        ensure_owner(&records[index], user_id)?;
        records.remove(index);
        self.persist(&records).await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNAVAILABLE;
    use crate::store::test_support::{analysis, context};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("analyses.json");

        let saved = JsonFileStore::new(&path)
            .save("alice", "INFY outlook", context("INFY outlook"), analysis("INFY outlook"))
            .await
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        let loaded = reopened.get_by_id(&saved.id).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(reopened.list_by_user("alice", 10).await.unwrap().len(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("none.json"));

        assert!(store.list_by_user("alice", 10).await.unwrap().is_empty());
        assert!(!store.delete("nope", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_respects_ownership() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("analyses.json"));
        let record = store
            .save("alice", "TCS outlook", context("TCS outlook"), analysis("TCS outlook"))
            .await
            .unwrap();

        assert!(matches!(
            store.delete(&record.id, "bob").await,
            Err(AnalyzerError::Forbidden { .. })
        ));
        assert!(store.delete(&record.id, "alice").await.unwrap());
        assert!(store.get_by_id(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_markers_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analyses.json");
        let store = JsonFileStore::new(&path);

        let mut ctx = context("XYZ outlook");
        ctx.quotes.insert(
            "XYZ".to_string(),
            crate::models::Quote::unavailable("XYZ", "no data"),
        );
        store
            .save("alice", "XYZ outlook", ctx, analysis("XYZ outlook"))
            .await
            .unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["context"]["quotes"]["XYZ"]["price"], UNAVAILABLE);
        assert_eq!(raw[0]["context"]["news_summary"], UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analyses.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileStore::new(&path).list_by_user("alice", 10).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::PersistenceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unwritable_location_is_persistence_unavailable() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        // parent "directory" is a regular file
        let store = JsonFileStore::new(blocker.join("analyses.json"));
        let err = store
            .save("alice", "INFY outlook", context("INFY outlook"), analysis("INFY outlook"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::PersistenceUnavailable(_)));
    }
}
