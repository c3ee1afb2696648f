//! `InvestigationStore`: one JSON file per record under
//! `${working_dir}/.agent/investigations/${id}.json`. Grounded on the
//! teacher's write-to-temp+rename convention (`utils::atomic_write`), here
//! using a `.tmp` sibling suffix rather than a `tempfile::NamedTempFile`.

use crate::investigation::types::Investigation;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("investigation '{0}' not found")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub struct InvestigationStore {
    root: PathBuf,
}

impl InvestigationStore {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            root: working_dir.as_ref().join(".agent/investigations"),
        }
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Atomic write: serialize to a `.tmp` sibling, then rename over the
    /// final path. A reader never observes a partially-written record.
    pub async fn store(&self, record: &Investigation) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.record_path(&record.id);
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Investigation, StoreError> {
        let path = self.record_path(id);
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| StoreError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn update(&self, record: &Investigation) -> Result<(), StoreError> {
        self.store(record).await
    }

    /// Iterates every readable record, skipping unreadable or malformed
    /// files rather than failing the whole listing.
    pub async fn list(&self) -> Vec<Investigation> {
        let mut records = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.root).await else {
            return records;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(body) => match serde_json::from_str(&body) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("skipping malformed investigation record {:?}: {e}", path),
                },
                Err(e) => warn!("skipping unreadable investigation record {:?}: {e}", path),
            }
        }
        records.sort_by(|a: &Investigation, b: &Investigation| a.started_at.cmp(&b.started_at));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigation::types::InvestigationStatus;
    use tempfile::tempdir;

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = InvestigationStore::new(dir.path());
        let inv = Investigation::new("inv-1", "alert-1", "sess-1");
        store.store(&inv).await.unwrap();
        let loaded = store.get("inv-1").await.unwrap();
        assert_eq!(loaded.id, inv.id);
        assert_eq!(loaded.alert_id, inv.alert_id);
        assert_eq!(loaded.status, inv.status);
    }

    #[tokio::test]
    async fn get_unknown_id_errors() {
        let dir = tempdir().unwrap();
        let store = InvestigationStore::new(dir.path());
        assert!(matches!(store.get("nope").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_skips_malformed_files() {
        let dir = tempdir().unwrap();
        let store = InvestigationStore::new(dir.path());
        let mut inv = Investigation::new("inv-1", "alert-1", "sess-1");
        inv.finish(InvestigationStatus::Completed, inv.started_at);
        store.store(&inv).await.unwrap();

        tokio::fs::create_dir_all(dir.path().join(".agent/investigations"))
            .await
            .unwrap();
        tokio::fs::write(
            dir.path().join(".agent/investigations/broken.json"),
            "not json",
        )
        .await
        .unwrap();

        let records = store.list().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "inv-1");
    }

    #[tokio::test]
    async fn update_overwrites_existing_record() {
        let dir = tempdir().unwrap();
        let store = InvestigationStore::new(dir.path());
        let mut inv = Investigation::new("inv-1", "alert-1", "sess-1");
        store.store(&inv).await.unwrap();

        inv.findings = "disk full".to_string();
        store.update(&inv).await.unwrap();

        let loaded = store.get("inv-1").await.unwrap();
        assert_eq!(loaded.findings, "disk full");
    }
}
