//! Domain layer for stepwise
//!
//! Pure types and logic with no I/O: conversation messages, generation
//! requests and their cache keys, the capability contract, the agent
//! lifecycle, plans and steps, routing tables, review grades and the
//! feature ledger.
//!
//! # Core Concepts
//!
//! - **Plan / Step**: an ordered decomposition of a goal; each step runs
//!   through an agent and is verified, with bounded retries.
//! - **Agent lifecycle**: `Idle → Running → {Finished | Error}`, carried as
//!   an explicit value through the think/act loop.
//! - **Routing table**: ordered match rules mapping a task descriptor to a
//!   specialized agent variant.
//! - **Cache key**: a fingerprint of a normalized pure-generation request.

pub mod agent;
pub mod config;
pub mod core;
pub mod generation;
pub mod ledger;
pub mod plan;
pub mod prompt;
pub mod review;
pub mod routing;
pub mod session;
pub mod tool;

pub use agent::{
    AgentLifecycle, AgentRunState, EffortLevel, LifecycleEvent, RunSummary, StuckDetector,
    Termination,
};
pub use config::{ConfigIssue, ConfigIssueCode, Severity};
pub use core::error::DomainError;
pub use generation::{CacheKey, GenerationRequest, SamplingParams};
pub use ledger::{FeatureEntry, FeatureLedger, LedgerError, ProgressEntry};
pub use plan::{
    DecompositionBounds, FailurePolicy, Plan, PlanStatus, PlanSummary, Step, StepDraft,
    StepRecord, StepStatus, StepTransition, parse_decomposition,
};
pub use prompt::{AgentPromptTemplate, ReviewPromptTemplate};
pub use review::{Checklist, Criterion, Grade, ReviewCycle, parse_grade};
pub use routing::{
    AgentVariant, MatchRule, RouteDecision, RoutingRule, RoutingTable, TaskDescriptor,
};
pub use session::{
    entities::{Message, MessageMetadata, Role},
    response::{ContentBlock, LlmResponse, StopReason},
};
pub use tool::{
    Capability, DefaultToolValidator, ToolCall, ToolDefinition, ToolError, ToolParameter,
    ToolResult, ToolValidator,
};
