//! Plan persistence port
//!
//! The in-memory plan is authoritative. A store only mirrors it, and a
//! failing store never changes the outcome of a run.

use async_trait::async_trait;
use stepwise_domain::{Plan, StepTransition};
use thiserror::Error;

/// Errors from persistence adapters (plans, checkpoints)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Port for mirroring plan state to durable storage
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Write the full plan record.
    async fn save_plan(&self, plan: &Plan) -> Result<(), StoreError>;

    /// Record one step status change. `plan` is the state after the change.
    async fn record_transition(
        &self,
        plan: &Plan,
        transition: &StepTransition,
    ) -> Result<(), StoreError>;
}

/// Keeps nothing.
pub struct NoPlanStore;

#[async_trait]
impl PlanStore for NoPlanStore {
    async fn save_plan(&self, _plan: &Plan) -> Result<(), StoreError> {
        Ok(())
    }

    async fn record_transition(
        &self,
        _plan: &Plan,
        _transition: &StepTransition,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}
