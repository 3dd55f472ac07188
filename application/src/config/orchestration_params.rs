//! Orchestration parameters for the use case loops
//!
//! Static knobs for the agent loop, the planning orchestrator and the review
//! loop. The infrastructure config loader fills these from TOML; tests build
//! them directly.

use crate::retry::Backoff;
use std::str::FromStr;
use std::time::Duration;
use stepwise_domain::{DecompositionBounds, EffortLevel, FailurePolicy, SamplingParams};

/// Executing-agent loop control.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentParams {
    /// Step budget for agents that are not routed to a variant.
    pub max_steps: usize,
    /// Raises every budget to at least the level's minimum.
    pub effort: Option<EffortLevel>,
    /// Identical earlier assistant replies before the stuck hint is injected.
    pub duplicate_threshold: usize,
    /// Snapshot the run every N steps.
    pub checkpoint_interval: Option<usize>,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            max_steps: 10,
            effort: None,
            duplicate_threshold: 2,
            checkpoint_interval: None,
        }
    }
}

impl AgentParams {
    /// Budget for a run configured with `configured` steps.
    pub fn effective_max_steps(&self, configured: usize) -> usize {
        match self.effort {
            Some(effort) => effort.effective_max_steps(configured),
            None => configured,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_effort(mut self, effort: EffortLevel) -> Self {
        self.effort = Some(effort);
        self
    }

    pub fn with_duplicate_threshold(mut self, threshold: usize) -> Self {
        self.duplicate_threshold = threshold;
        self
    }

    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = (interval > 0).then_some(interval);
        self
    }
}

/// How a step result is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationMode {
    /// Ask the model to grade the result.
    #[default]
    Model,
    /// Accept any untruncated run that produced a final answer.
    Structural,
}

impl VerificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMode::Model => "model",
            VerificationMode::Structural => "structural",
        }
    }
}

impl FromStr for VerificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model" | "reviewer" => Ok(VerificationMode::Model),
            "structural" => Ok(VerificationMode::Structural),
            other => Err(format!("unknown verification mode '{}'", other)),
        }
    }
}

/// Planning orchestrator control.
///
/// No `Default`: the failure policy must always be chosen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningParams {
    pub bounds: DecompositionBounds,
    /// Maximum attempts per step, including the first.
    pub retry_budget: usize,
    pub step_backoff: Backoff,
    pub failure_policy: FailurePolicy,
    pub verification: VerificationMode,
    /// Decomposition calls before the plan is rejected.
    pub decomposition_attempts: usize,
    /// Wall-clock limit of one parallel branch.
    pub branch_timeout: Duration,
}

impl PlanningParams {
    pub fn new(failure_policy: FailurePolicy) -> Self {
        Self {
            bounds: DecompositionBounds::default(),
            retry_budget: 3,
            step_backoff: Backoff::Exponential {
                base: Duration::from_millis(500),
                max: Duration::from_secs(8),
            },
            failure_policy,
            verification: VerificationMode::default(),
            decomposition_attempts: 2,
            branch_timeout: Duration::from_secs(300),
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_bounds(mut self, bounds: DecompositionBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_retry_budget(mut self, budget: usize) -> Self {
        self.retry_budget = budget;
        self
    }

    pub fn with_step_backoff(mut self, backoff: Backoff) -> Self {
        self.step_backoff = backoff;
        self
    }

    pub fn with_verification(mut self, mode: VerificationMode) -> Self {
        self.verification = mode;
        self
    }

    pub fn with_decomposition_attempts(mut self, attempts: usize) -> Self {
        self.decomposition_attempts = attempts;
        self
    }

    pub fn with_branch_timeout(mut self, timeout: Duration) -> Self {
        self.branch_timeout = timeout;
        self
    }
}

/// Review loop control.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewParams {
    pub max_iterations: usize,
}

impl Default for ReviewParams {
    fn default() -> Self {
        Self { max_iterations: 3 }
    }
}

/// Everything a run needs besides its ports.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestrationParams {
    pub model: String,
    pub sampling: SamplingParams,
    pub agent: AgentParams,
    pub planning: PlanningParams,
    pub review: ReviewParams,
}

impl OrchestrationParams {
    pub fn new(model: impl Into<String>, failure_policy: FailurePolicy) -> Self {
        Self {
            model: model.into(),
            sampling: SamplingParams::default(),
            agent: AgentParams::default(),
            planning: PlanningParams::new(failure_policy),
            review: ReviewParams::default(),
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_agent(mut self, agent: AgentParams) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_planning(mut self, planning: PlanningParams) -> Self {
        self.planning = planning;
        self
    }

    pub fn with_review(mut self, review: ReviewParams) -> Self {
        self.review = review;
        self
    }
}
