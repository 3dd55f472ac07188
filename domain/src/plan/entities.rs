//! Plan and Step entities

use super::parser::StepDraft;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (InProgress, Completed | Failed | Pending)
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Running,
    Completed,
    /// Every step is terminal and at least one failed under the skip policy.
    CompletedWithFailures,
    Aborted,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Running => "running",
            PlanStatus::Completed => "completed",
            PlanStatus::CompletedWithFailures => "completed_with_failures",
            PlanStatus::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PlanStatus::Running)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of planned work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_tag: Option<String>,
    status: StepStatus,
    attempt_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feedback: Option<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            executor_tag: None,
            status: StepStatus::Pending,
            attempt_count: 0,
            result: None,
            feedback: None,
        }
    }

    pub fn with_executor_tag(mut self, tag: impl Into<String>) -> Self {
        self.executor_tag = Some(tag.into());
        self
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn attempt_count(&self) -> usize {
        self.attempt_count
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Feedback from the latest failed verification.
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn record(&self) -> StepRecord {
        StepRecord {
            id: self.id.clone(),
            description: self.description.clone(),
            status: self.status,
            executor_tag: self.executor_tag.clone(),
            attempt_count: self.attempt_count,
        }
    }

    fn move_to(&mut self, next: StepStatus) -> Result<StepStatus, DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::transition(self.status, next));
        }
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }
}

/// Persisted shape of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_tag: Option<String>,
    pub attempt_count: usize,
}

/// One status change of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTransition {
    pub plan_id: String,
    pub step_id: String,
    pub from: StepStatus,
    pub to: StepStatus,
    pub attempt: usize,
}

/// Ordered decomposition of a goal.
///
/// Step order is fixed at construction. At most one step is current; it stays
/// current across retry re-entries until it reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    id: String,
    goal: String,
    steps: Vec<Step>,
    status: PlanStatus,
    current: Option<usize>,
}

impl Plan {
    pub fn new(
        id: impl Into<String>,
        goal: impl Into<String>,
        steps: Vec<Step>,
    ) -> Result<Self, DomainError> {
        if steps.is_empty() {
            return Err(DomainError::InvalidPlan("a plan needs at least one step".into()));
        }
        Ok(Self {
            id: id.into(),
            goal: goal.into(),
            steps,
            status: PlanStatus::Running,
            current: None,
        })
    }

    /// Build a plan from parsed drafts, numbering steps `step-1`, `step-2`, ...
    pub fn from_drafts(
        id: impl Into<String>,
        goal: impl Into<String>,
        drafts: Vec<StepDraft>,
    ) -> Result<Self, DomainError> {
        let steps = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| {
                let step = Step::new(format!("step-{}", i + 1), draft.description);
                match draft.executor_tag {
                    Some(tag) => step.with_executor_tag(tag),
                    None => step,
                }
            })
            .collect();
        Self::new(id, goal, steps)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Index of the first step still waiting to run.
    pub fn next_pending(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
    }

    /// (completed, total)
    pub fn progress(&self) -> (usize, usize) {
        let done = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        (done, self.steps.len())
    }

    fn step_mut(&mut self, index: usize) -> Result<&mut Step, DomainError> {
        self.steps
            .get_mut(index)
            .ok_or(DomainError::UnknownStep(index))
    }

    fn ensure_running(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::transition(self.status, "step update"));
        }
        Ok(())
    }

    fn transition_record(&self, index: usize, from: StepStatus) -> StepTransition {
        let step = &self.steps[index];
        StepTransition {
            plan_id: self.id.clone(),
            step_id: step.id.clone(),
            from,
            to: step.status,
            attempt: step.attempt_count,
        }
    }

    /// Start the next attempt of step `index`, bounded by `retry_budget`.
    pub fn begin_attempt(
        &mut self,
        index: usize,
        retry_budget: usize,
    ) -> Result<StepTransition, DomainError> {
        self.ensure_running()?;
        if let Some(current) = self.current
            && current != index
        {
            return Err(DomainError::InvalidPlan(format!(
                "step {} is still current",
                self.steps[current].id
            )));
        }
        let step = self.step_mut(index)?;
        if step.attempt_count >= retry_budget {
            return Err(DomainError::AttemptBudgetExceeded {
                step: step.id.clone(),
                budget: retry_budget,
            });
        }
        let from = step.move_to(StepStatus::InProgress)?;
        step.attempt_count += 1;
        self.current = Some(index);
        Ok(self.transition_record(index, from))
    }

    pub fn complete_step(
        &mut self,
        index: usize,
        result: impl Into<String>,
    ) -> Result<StepTransition, DomainError> {
        self.ensure_running()?;
        let step = self.step_mut(index)?;
        let from = step.move_to(StepStatus::Completed)?;
        step.result = Some(result.into());
        self.current = None;
        Ok(self.transition_record(index, from))
    }

    /// Send an in-progress step back to `Pending` for another attempt.
    pub fn retry_step(
        &mut self,
        index: usize,
        feedback: impl Into<String>,
    ) -> Result<StepTransition, DomainError> {
        self.ensure_running()?;
        let step = self.step_mut(index)?;
        let from = step.move_to(StepStatus::Pending)?;
        step.feedback = Some(feedback.into());
        Ok(self.transition_record(index, from))
    }

    pub fn fail_step(
        &mut self,
        index: usize,
        feedback: impl Into<String>,
    ) -> Result<StepTransition, DomainError> {
        self.ensure_running()?;
        let step = self.step_mut(index)?;
        let from = step.move_to(StepStatus::Failed)?;
        step.feedback = Some(feedback.into());
        self.current = None;
        Ok(self.transition_record(index, from))
    }

    /// Stop the plan. Remaining steps keep their last status.
    pub fn abort(&mut self) {
        self.status = PlanStatus::Aborted;
        self.current = None;
    }

    /// Derive the final status once every step is terminal.
    pub fn finalize(&mut self) -> Result<PlanStatus, DomainError> {
        self.ensure_running()?;
        if let Some(open) = self.steps.iter().find(|s| !s.status.is_terminal()) {
            return Err(DomainError::InvalidPlan(format!(
                "step {} is still {}",
                open.id, open.status
            )));
        }
        self.status = if self.steps.iter().all(|s| s.status == StepStatus::Completed) {
            PlanStatus::Completed
        } else {
            PlanStatus::CompletedWithFailures
        };
        Ok(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(n: usize) -> Plan {
        let steps = (1..=n)
            .map(|i| Step::new(format!("step-{}", i), format!("do thing {}", i)))
            .collect();
        Plan::new("plan-1", "goal", steps).unwrap()
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert!(Plan::new("p", "g", Vec::new()).is_err());
    }

    #[test]
    fn test_step_transitions() {
        assert!(StepStatus::Pending.can_transition_to(StepStatus::InProgress));
        assert!(StepStatus::InProgress.can_transition_to(StepStatus::Pending));
        assert!(!StepStatus::Pending.can_transition_to(StepStatus::Completed));
        assert!(!StepStatus::Completed.can_transition_to(StepStatus::Pending));
        assert!(!StepStatus::Failed.can_transition_to(StepStatus::InProgress));
    }

    #[test]
    fn test_retry_reentry_counts_attempts() {
        let mut plan = plan(2);
        let t = plan.begin_attempt(0, 3).unwrap();
        assert_eq!((t.from, t.to, t.attempt), (StepStatus::Pending, StepStatus::InProgress, 1));

        plan.retry_step(0, "missing tests").unwrap();
        assert_eq!(plan.current(), Some(0));
        assert_eq!(plan.step(0).unwrap().feedback(), Some("missing tests"));

        plan.begin_attempt(0, 3).unwrap();
        plan.complete_step(0, "done").unwrap();

        let step = plan.step(0).unwrap();
        assert_eq!(step.status(), StepStatus::Completed);
        assert_eq!(step.attempt_count(), 2);
        assert_eq!(plan.current(), None);
    }

    #[test]
    fn test_attempts_never_exceed_budget() {
        let mut plan = plan(1);
        for _ in 0..2 {
            plan.begin_attempt(0, 2).unwrap();
            plan.retry_step(0, "no").unwrap();
        }
        let err = plan.begin_attempt(0, 2).unwrap_err();
        assert!(matches!(err, DomainError::AttemptBudgetExceeded { budget: 2, .. }));
        assert_eq!(plan.step(0).unwrap().attempt_count(), 2);
    }

    #[test]
    fn test_only_one_current_step() {
        let mut plan = plan(2);
        plan.begin_attempt(0, 3).unwrap();
        assert!(plan.begin_attempt(1, 3).is_err());
    }

    #[test]
    fn test_terminal_step_is_final() {
        let mut plan = plan(1);
        plan.begin_attempt(0, 3).unwrap();
        plan.fail_step(0, "broken").unwrap();
        assert!(plan.begin_attempt(0, 3).is_err());
        assert!(plan.complete_step(0, "late").is_err());
    }

    #[test]
    fn test_finalize_statuses() {
        let mut all_ok = plan(1);
        all_ok.begin_attempt(0, 1).unwrap();
        all_ok.complete_step(0, "ok").unwrap();
        assert_eq!(all_ok.finalize().unwrap(), PlanStatus::Completed);

        let mut mixed = plan(2);
        mixed.begin_attempt(0, 1).unwrap();
        mixed.fail_step(0, "no").unwrap();
        mixed.begin_attempt(1, 1).unwrap();
        mixed.complete_step(1, "ok").unwrap();
        assert_eq!(mixed.finalize().unwrap(), PlanStatus::CompletedWithFailures);
    }

    #[test]
    fn test_finalize_rejects_open_steps() {
        let mut plan = plan(2);
        assert!(plan.finalize().is_err());
        assert_eq!(plan.status(), PlanStatus::Running);
    }

    #[test]
    fn test_abort_blocks_further_updates() {
        let mut plan = plan(2);
        plan.abort();
        assert_eq!(plan.status(), PlanStatus::Aborted);
        assert!(plan.begin_attempt(0, 3).is_err());
    }

    #[test]
    fn test_from_drafts_numbers_steps() {
        let drafts = vec![
            StepDraft::new("write test"),
            StepDraft::new("run build").with_executor_tag("build"),
        ];
        let plan = Plan::from_drafts("p", "g", drafts).unwrap();
        assert_eq!(plan.steps()[0].id, "step-1");
        assert_eq!(plan.steps()[1].executor_tag.as_deref(), Some("build"));
        assert_eq!(plan.next_pending(), Some(0));
        assert_eq!(plan.progress(), (0, 2));
    }

    #[test]
    fn test_record_shape() {
        let step = Step::new("step-1", "desc").with_executor_tag("test");
        let value = serde_json::to_value(step.record()).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["attempt_count"], 0);
        assert_eq!(value["executor_tag"], "test");
    }
}
