//! Per-invocation agent state carried through the think/act loop

use super::lifecycle::{AgentLifecycle, LifecycleEvent};
use crate::core::error::DomainError;
use crate::session::entities::{Message, Role};
use serde::{Deserialize, Serialize};

/// Why a run reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model answered without requesting capabilities.
    FinalAnswer,
    /// The model invoked the reserved terminate capability.
    TerminateRequested,
    /// The step counter reached the budget.
    StepBudgetExhausted,
    /// A supervising wall-clock limit cut the run short.
    WallClockExceeded,
    /// The caller cancelled between cycles.
    Cancelled,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::FinalAnswer => "final_answer",
            Termination::TerminateRequested => "terminate_requested",
            Termination::StepBudgetExhausted => "step_budget_exhausted",
            Termination::WallClockExceeded => "wall_clock_exceeded",
            Termination::Cancelled => "cancelled",
        }
    }

    /// Truncated runs finished normally but did not complete their work.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            Termination::StepBudgetExhausted | Termination::WallClockExceeded
        )
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle, step counter and transcript of one agent invocation.
///
/// Invariant: `step <= max_steps`; once the lifecycle is terminal no further
/// step can begin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunState {
    lifecycle: AgentLifecycle,
    step: usize,
    max_steps: usize,
    transcript: Vec<Message>,
    termination: Option<Termination>,
    error: Option<String>,
}

impl AgentRunState {
    pub fn new(max_steps: usize, transcript: Vec<Message>) -> Self {
        Self {
            lifecycle: AgentLifecycle::Idle,
            step: 0,
            max_steps,
            transcript,
            termination: None,
            error: None,
        }
    }

    pub fn lifecycle(&self) -> AgentLifecycle {
        self.lifecycle
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn into_transcript(self) -> Vec<Message> {
        self.transcript
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_truncated(&self) -> bool {
        self.termination.is_some_and(|t| t.is_truncated())
    }

    pub fn has_budget(&self) -> bool {
        self.step < self.max_steps
    }

    /// Fresh `Idle` invocation continuing a saved state: same transcript,
    /// step counter and budget, with the outcome of the saved run cleared.
    pub fn reopen(self) -> Self {
        Self {
            lifecycle: AgentLifecycle::Idle,
            termination: None,
            error: None,
            ..self
        }
    }

    pub fn start(&mut self) -> Result<(), DomainError> {
        self.lifecycle = self.lifecycle.transition(LifecycleEvent::Start)?;
        Ok(())
    }

    /// Count one think/act cycle. Fails when the run is not running or the
    /// budget is already spent.
    pub fn begin_step(&mut self) -> Result<usize, DomainError> {
        if self.lifecycle != AgentLifecycle::Running {
            return Err(DomainError::transition(self.lifecycle, "step"));
        }
        if !self.has_budget() {
            return Err(DomainError::StepBudgetExhausted(self.max_steps));
        }
        self.step += 1;
        Ok(self.step)
    }

    pub fn push(&mut self, message: Message) {
        self.transcript.push(message);
    }

    pub fn finish(&mut self, termination: Termination) -> Result<(), DomainError> {
        self.lifecycle = self.lifecycle.transition(LifecycleEvent::Finish)?;
        self.termination = Some(termination);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.lifecycle = self.lifecycle.transition(LifecycleEvent::Fail)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Content of the last non-empty assistant message.
    pub fn final_text(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
            .find(|c| !c.trim().is_empty())
    }

    pub fn tool_call_count(&self) -> usize {
        self.transcript.iter().map(|m| m.tool_calls.len()).sum()
    }
}
