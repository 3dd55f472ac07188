//! Effort levels raising the step budget of an agent run

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Coarse effort hint mapped to a minimum step budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

impl EffortLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffortLevel::Low => "low",
            EffortLevel::Medium => "medium",
            EffortLevel::High => "high",
        }
    }

    pub fn steps(&self) -> usize {
        match self {
            EffortLevel::Low => 10,
            EffortLevel::Medium => 20,
            EffortLevel::High => 50,
        }
    }

    /// The larger of the configured budget and this level's budget.
    pub fn effective_max_steps(&self, configured: usize) -> usize {
        configured.max(self.steps())
    }
}

impl FromStr for EffortLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "l" => Ok(EffortLevel::Low),
            "medium" | "med" | "m" => Ok(EffortLevel::Medium),
            "high" | "h" => Ok(EffortLevel::High),
            other => Err(format!("unknown effort level '{}'", other)),
        }
    }
}

impl std::fmt::Display for EffortLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
