//! Application layer for stepwise
//!
//! This crate contains use cases, port definitions, the bounded retry
//! combinator and execution parameters. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod retry;
pub mod use_cases;

// Re-export commonly used types
pub use config::{
    AgentParams, OrchestrationParams, PlanningParams, ReviewParams, VerificationMode,
};
pub use ports::{
    agent_progress::{NoProgress, OrchestrationProgress},
    checkpoint::{AgentSnapshot, CheckpointPort, NoCheckpoints, SnapshotReason},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_gateway::{
        GatewayError, GenerationBackend, GenerationObserver, LlmGateway, NoObserver,
    },
    plan_store::{NoPlanStore, PlanStore, StoreError},
    tool_executor::ToolExecutorPort,
};
pub use retry::{Attempt, Backoff, RetryError, RetryPolicy, Retried, retry_with};
pub use use_cases::execute_agent::{AgentExecutor, AgentRunError, AgentRunOutput, AgentTask};
pub use use_cases::review_loop::{ReviewError, ReviewOrchestrator, ReviewOutput};
pub use use_cases::run_plan::{
    AbortCause, AbortReport, Branch, BranchOutcome, BranchRunOutput, ModelVerifier,
    PlanRunError, PlanRunOutput, PlanningOrchestrator, StepExecution, StepVerifier,
    StructuralVerifier, Verdict,
};
pub use use_cases::shared::AgentServices;
pub use use_cases::sub_agents::{ScopedToolExecutor, SubAgentRegistry, SubAgentReport};
