//! Failure policy and decomposition bounds

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What happens to the rest of a plan once a step is marked failed.
///
/// There is no default: every orchestration run names its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the remaining plan.
    Abort,
    /// Log the degradation and continue with the next step.
    SkipAndContinue,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Abort => "abort",
            FailurePolicy::SkipAndContinue => "skip_and_continue",
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" | "continue" | "skip_and_continue" => Ok(FailurePolicy::SkipAndContinue),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive range for the number of steps a decomposition may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionBounds {
    min: usize,
    max: usize,
}

impl Default for DecompositionBounds {
    fn default() -> Self {
        Self { min: 5, max: 10 }
    }
}

/// Drafts that fit the bounds, and how many were cut off the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fitted<T> {
    pub steps: Vec<T>,
    pub dropped: usize,
}

impl DecompositionBounds {
    pub fn new(min: usize, max: usize) -> Result<Self, DomainError> {
        if min == 0 || min > max {
            return Err(DomainError::InvalidPlan(format!(
                "invalid step bounds {}..={}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Truncate an oversized list; reject one that is too short.
    pub fn fit<T>(&self, mut steps: Vec<T>) -> Result<Fitted<T>, DomainError> {
        if steps.len() < self.min {
            return Err(DomainError::InvalidPlan(format!(
                "expected at least {} steps, got {}",
                self.min,
                steps.len()
            )));
        }
        let dropped = steps.len().saturating_sub(self.max);
        steps.truncate(self.max);
        Ok(Fitted { steps, dropped })
    }
}
