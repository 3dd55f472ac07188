//! Shared plumbing for use cases.
//!
//! [`AgentServices`] bundles the ports every orchestrator hands down to the
//! agents it creates, so a sub-agent shares its parent's gateway, logger and
//! cancellation token.

use crate::ports::agent_progress::{NoProgress, OrchestrationProgress};
use crate::ports::checkpoint::{CheckpointPort, NoCheckpoints};
use crate::ports::conversation_logger::{ConversationLogger, NoConversationLogger};
use crate::ports::llm_gateway::LlmGateway;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ports shared by all agents of one run.
#[derive(Clone)]
pub struct AgentServices {
    pub gateway: Arc<dyn LlmGateway>,
    pub progress: Arc<dyn OrchestrationProgress>,
    pub logger: Arc<dyn ConversationLogger>,
    pub checkpoints: Arc<dyn CheckpointPort>,
    pub cancellation_token: Option<CancellationToken>,
}

impl AgentServices {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            gateway,
            progress: Arc::new(NoProgress),
            logger: Arc::new(NoConversationLogger),
            checkpoints: Arc::new(NoCheckpoints),
            cancellation_token: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn OrchestrationProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Arc<dyn CheckpointPort>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        is_cancelled(&self.cancellation_token)
    }
}

/// Check if cancellation has been requested.
pub(crate) fn is_cancelled(token: &Option<CancellationToken>) -> bool {
    token.as_ref().is_some_and(|t| t.is_cancelled())
}
