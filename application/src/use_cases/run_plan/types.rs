//! Types for the planning orchestrator

use crate::ports::llm_gateway::GatewayError;
use crate::use_cases::execute_agent::AgentRunError;
use crate::use_cases::sub_agents::SubAgentReport;
use stepwise_domain::{DomainError, Plan, PlanSummary, RunSummary};
use thiserror::Error;

/// Errors that prevent a plan from running at all
#[derive(Error, Debug)]
pub enum PlanRunError {
    #[error("Decomposition failed after {attempts} attempt(s): {reason}")]
    DecompositionFailed { attempts: usize, reason: String },

    #[error("Backend error during decomposition: {0}")]
    Backend(#[from] GatewayError),

    #[error("Plan state error: {0}")]
    State(#[from] DomainError),

    #[error("Synthesis failed: {0}")]
    Agent(#[from] AgentRunError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl PlanRunError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlanRunError::Cancelled)
    }
}

/// Why a plan stopped before every step was terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortCause {
    /// A step failed verification on every attempt under the abort policy.
    StepFailed {
        step_id: String,
        description: String,
        feedback: String,
    },
    /// The backend failed in a way retrying cannot fix.
    Backend { step_id: String, error: GatewayError },
    Cancelled { step_id: Option<String> },
}

impl std::fmt::Display for AbortCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortCause::StepFailed {
                step_id,
                description,
                feedback,
            } => write!(
                f,
                "step {} ({}) failed verification: {}",
                step_id, description, feedback
            ),
            AbortCause::Backend { step_id, error } => {
                write!(f, "step {} hit a backend error: {}", step_id, error)
            }
            AbortCause::Cancelled { step_id: Some(id) } => write!(f, "cancelled at step {}", id),
            AbortCause::Cancelled { step_id: None } => write!(f, "cancelled"),
        }
    }
}

/// Abort cause plus where the plan stood.
#[derive(Debug, Clone, PartialEq)]
pub struct AbortReport {
    pub cause: AbortCause,
    pub completed_steps: usize,
    pub total_steps: usize,
}

/// Result of a plan run that got past decomposition.
#[derive(Debug, Clone)]
pub struct PlanRunOutput {
    pub plan: Plan,
    pub summary: PlanSummary,
    pub abort: Option<AbortReport>,
    /// Status changes the plan store failed to persist.
    pub marking_failures: usize,
}

impl PlanRunOutput {
    pub fn is_success(&self) -> bool {
        self.abort.is_none()
    }
}

/// One independent unit of parallel work.
#[derive(Debug, Clone)]
pub struct Branch {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub executor_tag: Option<String>,
}

impl Branch {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
            executor_tag: None,
        }
    }

    pub fn with_executor_tag(mut self, tag: impl Into<String>) -> Self {
        self.executor_tag = Some(tag.into());
        self
    }
}

/// Terminal state of one branch.
#[derive(Debug, Clone)]
pub struct BranchOutcome {
    pub name: String,
    /// The routed report, or the error that ended the branch.
    pub report: Result<SubAgentReport, String>,
}

impl BranchOutcome {
    pub fn succeeded(&self) -> bool {
        self.report.as_ref().is_ok_and(|r| r.is_complete())
    }
}

/// Every branch outcome, in submission order, plus the synthesized answer.
#[derive(Debug, Clone)]
pub struct BranchRunOutput {
    pub branches: Vec<BranchOutcome>,
    pub synthesis: String,
    pub synthesis_summary: RunSummary,
}

/// Error value threaded between attempts of one step.
#[derive(Debug, Clone)]
pub(super) enum StepFailure {
    /// Verification or agent failure; feedback goes into the next attempt.
    Rejected(String),
    Backend(GatewayError),
    Cancelled,
}

impl StepFailure {
    pub(super) fn is_retryable(&self) -> bool {
        matches!(self, StepFailure::Rejected(_))
    }

    pub(super) fn feedback(&self) -> Option<&str> {
        match self {
            StepFailure::Rejected(feedback) => Some(feedback),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_cause_display() {
        let cause = AbortCause::StepFailed {
            step_id: "step-2".into(),
            description: "run tests".into(),
            feedback: "two tests fail".into(),
        };
        assert_eq!(
            cause.to_string(),
            "step step-2 (run tests) failed verification: two tests fail"
        );
        let backend = AbortCause::Backend {
            step_id: "step-1".into(),
            error: GatewayError::MalformedRequest("bad".into()),
        };
        assert!(backend.to_string().contains("Request malformed"));
    }

    #[test]
    fn test_only_rejections_are_retryable() {
        assert!(StepFailure::Rejected("x".into()).is_retryable());
        assert!(!StepFailure::Backend(GatewayError::QuotaExceeded("q".into())).is_retryable());
        assert!(!StepFailure::Cancelled.is_retryable());
    }
}
