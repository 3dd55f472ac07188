//! Rotating agent checkpoint store

use super::write_atomic;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stepwise_application::ports::checkpoint::{AgentSnapshot, CheckpointPort, SnapshotReason};
use stepwise_application::ports::plan_store::StoreError;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const INDEX_FILE: &str = "index.json";
const DEFAULT_MAX_CHECKPOINTS: usize = 20;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Checkpoint not found: {0}")]
    NotFound(String),
}

impl From<CheckpointError> for StoreError {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::Io(e) => StoreError::Io(e.to_string()),
            CheckpointError::Corrupt(e) => StoreError::Serialization(e.to_string()),
            CheckpointError::NotFound(id) => StoreError::NotFound(id),
        }
    }
}

/// Index entry describing one stored snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub id: String,
    pub agent: String,
    pub reason: SnapshotReason,
    pub step: usize,
    pub created_at: DateTime<Utc>,
}

/// Stores snapshots as `<dir>/<id>.json` next to an `index.json` listing
/// them oldest first. Once more than `max_checkpoints` exist the oldest are
/// deleted.
pub struct FileCheckpointStore {
    dir: PathBuf,
    max_checkpoints: usize,
    lock: Mutex<u64>,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
            lock: Mutex::new(0),
        }
    }

    pub fn with_max_checkpoints(mut self, max: usize) -> Self {
        self.max_checkpoints = max.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    async fn read_index(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        match tokio::fs::read_to_string(self.dir.join(INDEX_FILE)).await {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored snapshots, oldest first.
    pub async fn list(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let _guard = self.lock.lock().await;
        self.read_index().await
    }

    pub async fn load(&self, id: &str) -> Result<AgentSnapshot, CheckpointError> {
        match tokio::fs::read_to_string(self.snapshot_path(id)).await {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CheckpointError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Most recent snapshot of `agent`, if any.
    pub async fn latest(&self, agent: &str) -> Result<Option<AgentSnapshot>, CheckpointError> {
        let index = self.list().await?;
        match index.iter().rev().find(|info| info.agent == agent) {
            Some(info) => self.load(&info.id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn store(&self, snapshot: &AgentSnapshot) -> Result<String, CheckpointError> {
        let mut seq = self.lock.lock().await;
        *seq += 1;
        let id = format!(
            "{}-{}-{}",
            sanitize(&snapshot.agent),
            snapshot.created_at.format("%Y%m%dT%H%M%S%3f"),
            *seq
        );

        write_atomic(&self.snapshot_path(&id), &serde_json::to_vec(snapshot)?).await?;

        let mut index = self.read_index().await?;
        index.push(CheckpointInfo {
            id: id.clone(),
            agent: snapshot.agent.clone(),
            reason: snapshot.reason,
            step: snapshot.state.step(),
            created_at: snapshot.created_at,
        });
        let excess = index.len().saturating_sub(self.max_checkpoints);
        let expired: Vec<CheckpointInfo> = index.drain(..excess).collect();
        write_atomic(&self.dir.join(INDEX_FILE), &serde_json::to_vec_pretty(&index)?).await?;

        for old in expired {
            if let Err(e) = tokio::fs::remove_file(self.snapshot_path(&old.id)).await {
                warn!(checkpoint = %old.id, error = %e, "Failed to delete rotated checkpoint");
            }
        }
        debug!(checkpoint = %id, kept = index.len(), "Checkpoint saved");
        Ok(id)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[async_trait]
impl CheckpointPort for FileCheckpointStore {
    async fn save(&self, snapshot: &AgentSnapshot) -> Result<String, StoreError> {
        Ok(self.store(snapshot).await?)
    }

    async fn load_snapshot(&self, id: &str) -> Result<AgentSnapshot, StoreError> {
        Ok(self.load(id).await?)
    }

    async fn latest_snapshot(&self, agent: &str) -> Result<Option<AgentSnapshot>, StoreError> {
        Ok(self.latest(agent).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stepwise_domain::{AgentRunState, Message};

    fn snapshot(agent: &str, reason: SnapshotReason) -> AgentSnapshot {
        AgentSnapshot::new(
            agent,
            "write docs",
            reason,
            AgentRunState::new(5, vec![Message::user("write docs")]),
        )
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        let id = store
            .save(&snapshot("step-1", SnapshotReason::Interval))
            .await
            .unwrap();

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded.task, "write docs");
        assert_eq!(store.list().await.unwrap()[0].id, id);
    }

    #[tokio::test]
    async fn test_rotation_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path()).with_max_checkpoints(2);
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(
                store
                    .save(&snapshot("agent", SnapshotReason::Interval))
                    .await
                    .unwrap(),
            );
        }

        let kept: Vec<String> = store.list().await.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(kept, ids[1..].to_vec());
        assert!(matches!(
            store.load(&ids[0]).await,
            Err(CheckpointError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_latest_filters_by_agent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        store.save(&snapshot("a", SnapshotReason::Interval)).await.unwrap();
        store.save(&snapshot("b", SnapshotReason::Error)).await.unwrap();

        let latest = store.latest("b").await.unwrap().unwrap();
        assert_eq!(latest.reason, SnapshotReason::Error);
        assert!(store.latest("c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unwritable_dir_maps_to_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let store = FileCheckpointStore::new(blocker.join("sub"));

        let err = store
            .save(&snapshot("a", SnapshotReason::Interval))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[tokio::test]
    async fn test_port_restores_latest_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn CheckpointPort> = Arc::new(FileCheckpointStore::new(dir.path()));
        store.save(&snapshot("coder", SnapshotReason::Interval)).await.unwrap();
        let id = store.save(&snapshot("coder", SnapshotReason::Error)).await.unwrap();

        let latest = store.latest_snapshot("coder").await.unwrap().unwrap();
        assert_eq!(latest.reason, SnapshotReason::Error);
        assert_eq!(store.load_snapshot(&id).await.unwrap(), latest);
        assert!(store.latest_snapshot("tester").await.unwrap().is_none());
        assert!(matches!(
            store.load_snapshot("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
