//! Deterministic end-of-run summary of a plan

use super::entities::{Plan, PlanStatus, StepStatus};
use crate::core::string::{preview, single_line};
use serde::{Deserialize, Serialize};

const DETAIL_CHARS: usize = 160;

/// Outcome of one step as reported in the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub id: String,
    pub description: String,
    pub status: StepStatus,
    pub attempts: usize,
    pub executor_tag: Option<String>,
    /// Result preview for completed steps, feedback for failed ones.
    pub detail: Option<String>,
}

/// Aggregated outcome of a plan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub plan_id: String,
    pub goal: String,
    pub status: PlanStatus,
    pub steps: Vec<StepOutcome>,
    /// Status transitions that could not be persisted.
    pub marking_failures: usize,
}

impl PlanSummary {
    pub fn from_plan(plan: &Plan, marking_failures: usize) -> Self {
        let steps = plan
            .steps()
            .iter()
            .map(|step| {
                let detail = match step.status() {
                    StepStatus::Completed => step.result(),
                    StepStatus::Failed => step.feedback(),
                    _ => None,
                }
                .map(|text| preview(&single_line(text), DETAIL_CHARS));

                StepOutcome {
                    id: step.id.clone(),
                    description: step.description.clone(),
                    status: step.status(),
                    attempts: step.attempt_count(),
                    executor_tag: step.executor_tag.clone(),
                    detail,
                }
            })
            .collect();

        Self {
            plan_id: plan.id().to_string(),
            goal: plan.goal().to_string(),
            status: plan.status(),
            steps,
            marking_failures,
        }
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn render(&self) -> String {
        let mut out = format!("Plan {}: {}\n", self.plan_id, self.goal);
        out.push_str(&format!(
            "Status: {} ({}/{} steps completed, {} failed)\n",
            self.status,
            self.count(StepStatus::Completed),
            self.steps.len(),
            self.count(StepStatus::Failed)
        ));

        for step in &self.steps {
            let mark = match step.status {
                StepStatus::Completed => "x",
                StepStatus::Failed => "!",
                StepStatus::InProgress => "~",
                StepStatus::Pending => " ",
            };
            let noun = if step.attempts == 1 { "attempt" } else { "attempts" };
            out.push_str(&format!(
                "  [{}] {} {} ({} {})",
                mark, step.id, step.description, step.attempts, noun
            ));
            if let Some(tag) = &step.executor_tag {
                out.push_str(&format!(" @{}", tag));
            }
            if let Some(detail) = &step.detail {
                out.push_str(&format!(": {}", detail));
            }
            out.push('\n');
        }

        if self.marking_failures > 0 {
            out.push_str(&format!(
                "Warning: {} status update(s) could not be persisted\n",
                self.marking_failures
            ));
        }
        out
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}
