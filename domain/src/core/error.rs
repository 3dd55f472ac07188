//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Step index {0} is out of range")]
    UnknownStep(usize),

    #[error("Retry budget of {budget} exhausted for step {step}")]
    AttemptBudgetExceeded { step: String, budget: usize },

    #[error("Step budget of {0} exhausted")]
    StepBudgetExhausted(usize),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    pub(crate) fn transition(from: impl ToString, to: impl ToString) -> Self {
        DomainError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_display() {
        let error = DomainError::transition("finished", "running");
        assert_eq!(
            error.to_string(),
            "Invalid state transition: finished -> running"
        );
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::UnknownStep(3).is_cancelled());
        assert!(!DomainError::InvalidPlan("empty".to_string()).is_cancelled());
    }
}
