//! Planning configuration from TOML (`[planning]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stepwise_application::{Backoff, PlanningParams, VerificationMode};
use stepwise_domain::{ConfigIssue, ConfigIssueCode, DecompositionBounds, FailurePolicy};

/// Raw planning configuration from TOML
///
/// # Example
///
/// ```toml
/// [planning]
/// min_steps = 5
/// max_steps = 10
/// retry_budget = 3                 # attempts per step, the first included
/// step_backoff_ms = 500            # 0 retries immediately
/// failure_policy = "abort"         # "abort" or "skip"
/// verification = "model"           # "model" or "structural"
/// decomposition_attempts = 2
/// branch_timeout_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePlanningConfig {
    pub min_steps: usize,
    pub max_steps: usize,
    pub retry_budget: usize,
    pub step_backoff_ms: u64,
    pub failure_policy: String,
    pub verification: String,
    pub decomposition_attempts: usize,
    pub branch_timeout_secs: u64,
}

impl Default for FilePlanningConfig {
    fn default() -> Self {
        Self {
            min_steps: 5,
            max_steps: 10,
            retry_budget: 3,
            step_backoff_ms: 500,
            failure_policy: "abort".to_string(),
            verification: "model".to_string(),
            decomposition_attempts: 2,
            branch_timeout_secs: 300,
        }
    }
}

impl FilePlanningConfig {
    /// An unrecognized policy is an error, not a warning: silently guessing
    /// whether to abort or continue would change what a run does.
    pub fn parse_failure_policy(&self) -> (FailurePolicy, Vec<ConfigIssue>) {
        match self.failure_policy.parse::<FailurePolicy>() {
            Ok(policy) => (policy, vec![]),
            Err(_) => {
                let issue = ConfigIssue::error(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "planning.failure_policy".to_string(),
                        value: self.failure_policy.clone(),
                        valid_values: vec!["abort".to_string(), "skip".to_string()],
                    },
                    format!(
                        "planning.failure_policy: unknown value '{}', falling back to 'abort'",
                        self.failure_policy
                    ),
                );
                (FailurePolicy::Abort, vec![issue])
            }
        }
    }

    pub fn parse_verification(&self) -> (VerificationMode, Vec<ConfigIssue>) {
        match self.verification.parse::<VerificationMode>() {
            Ok(mode) => (mode, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "planning.verification".to_string(),
                        value: self.verification.clone(),
                        valid_values: vec!["model".to_string(), "structural".to_string()],
                    },
                    format!(
                        "planning.verification: unknown value '{}', falling back to 'model'",
                        self.verification
                    ),
                );
                (VerificationMode::default(), vec![issue])
            }
        }
    }

    pub fn parse_bounds(&self) -> (DecompositionBounds, Vec<ConfigIssue>) {
        match DecompositionBounds::new(self.min_steps, self.max_steps) {
            Ok(bounds) => (bounds, vec![]),
            Err(_) => {
                let fallback = DecompositionBounds::default();
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidBounds {
                        field: "planning.min_steps..max_steps".to_string(),
                        min: self.min_steps,
                        max: self.max_steps,
                    },
                    format!(
                        "planning: step bounds {}..={} are invalid, using {}..={}",
                        self.min_steps,
                        self.max_steps,
                        fallback.min(),
                        fallback.max()
                    ),
                );
                (fallback, vec![issue])
            }
        }
    }

    pub fn to_params(&self) -> (PlanningParams, Vec<ConfigIssue>) {
        let (policy, mut issues) = self.parse_failure_policy();
        let (verification, more) = self.parse_verification();
        issues.extend(more);
        let (bounds, more) = self.parse_bounds();
        issues.extend(more);

        let mut params = PlanningParams::new(policy)
            .with_bounds(bounds)
            .with_verification(verification)
            .with_decomposition_attempts(self.decomposition_attempts.max(1));

        if self.retry_budget == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroBudget {
                    field: "planning.retry_budget".to_string(),
                },
                format!(
                    "planning.retry_budget: 0 is not allowed, using {}",
                    params.retry_budget
                ),
            ));
        } else {
            params = params.with_retry_budget(self.retry_budget);
        }

        if self.branch_timeout_secs == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroBudget {
                    field: "planning.branch_timeout_secs".to_string(),
                },
                format!(
                    "planning.branch_timeout_secs: 0 is not allowed, using {}",
                    params.branch_timeout.as_secs()
                ),
            ));
        } else {
            params = params.with_branch_timeout(Duration::from_secs(self.branch_timeout_secs));
        }

        let backoff = match self.step_backoff_ms {
            0 => Backoff::None,
            ms => Backoff::Exponential {
                base: Duration::from_millis(ms),
                max: Duration::from_millis(ms.saturating_mul(16)),
            },
        };
        (params.with_step_backoff(backoff), issues)
    }
}
