//! Agent checkpoint port

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stepwise_domain::AgentRunState;

use super::plan_store::StoreError;

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotReason {
    /// Every `checkpoint_interval` steps.
    Interval,
    /// Right before an agent run reports an error.
    Error,
}

/// Point-in-time copy of an agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent: String,
    pub task: String,
    pub reason: SnapshotReason,
    pub created_at: DateTime<Utc>,
    pub state: AgentRunState,
}

impl AgentSnapshot {
    pub fn new(
        agent: impl Into<String>,
        task: impl Into<String>,
        reason: SnapshotReason,
        state: AgentRunState,
    ) -> Self {
        Self {
            agent: agent.into(),
            task: task.into(),
            reason,
            created_at: Utc::now(),
            state,
        }
    }
}

/// Port for persisting and restoring agent snapshots
#[async_trait]
pub trait CheckpointPort: Send + Sync {
    /// Persist a snapshot and return its id.
    async fn save(&self, snapshot: &AgentSnapshot) -> Result<String, StoreError>;

    /// Snapshot stored under `id`.
    async fn load_snapshot(&self, id: &str) -> Result<AgentSnapshot, StoreError>;

    /// Most recent snapshot of `agent`, if any.
    async fn latest_snapshot(&self, agent: &str) -> Result<Option<AgentSnapshot>, StoreError>;
}

/// Discards snapshots.
pub struct NoCheckpoints;

#[async_trait]
impl CheckpointPort for NoCheckpoints {
    async fn save(&self, _snapshot: &AgentSnapshot) -> Result<String, StoreError> {
        Ok(String::new())
    }

    async fn load_snapshot(&self, id: &str) -> Result<AgentSnapshot, StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }

    async fn latest_snapshot(&self, _agent: &str) -> Result<Option<AgentSnapshot>, StoreError> {
        Ok(None)
    }
}
