//! Planning orchestrator use case
//!
//! ```text
//! goal ─▶ decompose (≤ N attempts, feedback on rejection)
//!           │
//!           ▼
//!   for each step in order:
//!       attempt ─▶ agent (direct or routed) ─▶ verify ─▶ pass ─▶ Completed
//!          ▲                                     │
//!          └──── backoff + feedback ◀── fail ────┘  (≤ retry_budget attempts)
//!       exhausted ─▶ Failed ─▶ abort plan | skip and continue
//!           │
//!           ▼
//!   PlanSummary
//! ```
//!
//! A fresh agent runs every attempt; the rejected attempt's feedback is the
//! only thing carried over. Backend errors that retrying cannot fix abort the
//! plan immediately.

mod branches;
mod decompose;
mod tracker;
pub mod types;
pub mod verify;

pub use types::{
    AbortCause, AbortReport, Branch, BranchOutcome, BranchRunOutput, PlanRunError, PlanRunOutput,
};
pub use verify::{ModelVerifier, StepExecution, StepVerifier, StructuralVerifier, Verdict};

use crate::config::{PlanningParams, VerificationMode};
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::plan_store::{NoPlanStore, PlanStore};
use crate::retry::{RetryError, RetryPolicy, retry_with};
use crate::use_cases::execute_agent::{AgentExecutor, AgentRunError, AgentTask};
use crate::use_cases::sub_agents::SubAgentRegistry;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use stepwise_domain::core::string::{preview, single_line};
use stepwise_domain::{
    AgentPromptTemplate, FailurePolicy, Plan, PlanSummary, Step, StepStatus, TaskDescriptor,
    Termination,
};
use tracker::StepTracker;
use tracing::{info, warn};
use types::StepFailure;

const DEFAULT_STEP_PROMPT: &str = "You are an executing agent working through one step of a larger plan. \
Do exactly what the current step asks, using the available capabilities, and report the result.";

/// Completed-step results are previewed to this length in later prompts.
const COMPLETED_RESULT_CHARS: usize = 400;

enum StepOutcome {
    Completed(String),
    Failed(String),
    Aborted(AbortCause),
}

/// Drives a goal through decomposition, ordered step execution and
/// verification.
pub struct PlanningOrchestrator {
    executor: AgentExecutor,
    sub_agents: Option<Arc<SubAgentRegistry>>,
    verifier: Arc<dyn StepVerifier>,
    store: Arc<dyn PlanStore>,
    params: PlanningParams,
    step_prompt: String,
}

impl PlanningOrchestrator {
    pub fn new(executor: AgentExecutor, params: PlanningParams) -> Self {
        let verifier: Arc<dyn StepVerifier> = match params.verification {
            VerificationMode::Model => Arc::new(
                ModelVerifier::new(
                    Arc::clone(&executor.services().gateway),
                    executor.model(),
                )
                .with_sampling(executor.sampling().clone()),
            ),
            VerificationMode::Structural => Arc::new(StructuralVerifier),
        };
        Self {
            executor,
            sub_agents: None,
            verifier,
            store: Arc::new(NoPlanStore),
            params,
            step_prompt: DEFAULT_STEP_PROMPT.to_string(),
        }
    }

    /// Route steps that carry an executor tag through `registry`.
    pub fn with_sub_agents(mut self, registry: Arc<SubAgentRegistry>) -> Self {
        self.sub_agents = Some(registry);
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn StepVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_step_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.step_prompt = prompt.into();
        self
    }

    pub fn params(&self) -> &PlanningParams {
        &self.params
    }

    /// Decompose `goal` and run the resulting plan.
    pub async fn run(&self, goal: &str) -> Result<PlanRunOutput, PlanRunError> {
        info!(
            policy = %self.params.failure_policy,
            retry_budget = self.params.retry_budget,
            verification = self.params.verification.as_str(),
            "Starting plan"
        );
        if self.executor.services().is_cancelled() {
            return Err(PlanRunError::Cancelled);
        }

        let tags = self
            .sub_agents
            .as_ref()
            .map(|registry| registry.variant_names())
            .unwrap_or_default();
        let fitted = decompose::decompose(
            &self.executor,
            goal,
            self.params.bounds,
            &tags,
            self.params.decomposition_attempts,
        )
        .await?;

        let plan_id = format!("plan-{}", Utc::now().format("%Y%m%dT%H%M%S%3f"));
        let plan = Plan::from_drafts(plan_id, goal, fitted.steps)?;
        self.execute(plan).await
    }

    /// Run an already decomposed plan.
    pub async fn execute(&self, plan: Plan) -> Result<PlanRunOutput, PlanRunError> {
        let services = self.executor.services();
        services.progress.on_plan_created(&plan);
        services.logger.log(ConversationEvent::new(
            "plan_created",
            json!({
                "plan_id": plan.id(),
                "goal": plan.goal(),
                "steps": plan.steps().iter().map(|s| s.record()).collect::<Vec<_>>(),
            }),
        ));
        info!(plan = %plan.id(), steps = plan.steps().len(), "Plan created");

        let tracker = StepTracker::new(plan, Arc::clone(&self.store), Arc::clone(&services.logger));
        tracker.save().await;

        let mut completed: Vec<(String, String)> = Vec::new();
        let mut abort = None;

        for index in 0..tracker.len() {
            let outcome = self.run_step(&tracker, index, &completed).await?;
            let step = tracker.step(index)?;
            services.progress.on_step_finished(&step);

            match outcome {
                StepOutcome::Completed(result) => {
                    completed.push((
                        step.description.clone(),
                        preview(&single_line(&result), COMPLETED_RESULT_CHARS),
                    ));
                }
                StepOutcome::Failed(feedback) => match self.params.failure_policy {
                    FailurePolicy::Abort => {
                        abort = Some(AbortCause::StepFailed {
                            step_id: step.id.clone(),
                            description: step.description.clone(),
                            feedback,
                        });
                        break;
                    }
                    FailurePolicy::SkipAndContinue => {
                        warn!(
                            step = %step.id,
                            "Step failed, continuing with the remaining steps (plan degraded)"
                        );
                    }
                },
                StepOutcome::Aborted(cause) => {
                    abort = Some(cause);
                    break;
                }
            }
        }

        match &abort {
            Some(cause) => {
                warn!(cause = %cause, "Plan aborted");
                tracker.abort();
            }
            None => {
                tracker.finalize()?;
            }
        }
        tracker.save().await;

        let (plan, marking_failures) = tracker.into_parts();
        let summary = PlanSummary::from_plan(&plan, marking_failures);
        let (completed_steps, total_steps) = plan.progress();

        services.logger.log(ConversationEvent::new(
            "plan_summary",
            json!({
                "plan_id": summary.plan_id,
                "status": summary.status,
                "completed": completed_steps,
                "failed": summary.count(StepStatus::Failed),
                "total": total_steps,
                "marking_failures": marking_failures,
                "abort": abort.as_ref().map(|c| c.to_string()),
            }),
        ));
        info!(
            plan = %plan.id(),
            status = %plan.status(),
            completed = completed_steps,
            total = total_steps,
            "Plan finished"
        );

        Ok(PlanRunOutput {
            plan,
            summary,
            abort: abort.map(|cause| AbortReport {
                cause,
                completed_steps,
                total_steps,
            }),
            marking_failures,
        })
    }

    async fn run_step(
        &self,
        tracker: &StepTracker,
        index: usize,
        completed: &[(String, String)],
    ) -> Result<StepOutcome, PlanRunError> {
        let step = tracker.step(index)?;
        let goal = tracker.snapshot().goal().to_string();
        let budget = self.params.retry_budget;
        let policy = RetryPolicy::new(budget, self.params.step_backoff);
        let services = self.executor.services();

        let result = retry_with(&policy, StepFailure::is_retryable, |attempt| {
            let step = &step;
            let goal = goal.as_str();
            async move {
                if services.is_cancelled() {
                    return Err(StepFailure::Cancelled);
                }
                let feedback = attempt.previous.as_ref().and_then(|f| f.feedback());
                tracker.begin_attempt(index, budget, feedback).await;
                services.progress.on_step_start(step, attempt.number);
                info!(step = %step.id, attempt = attempt.number, budget, "Running step");

                let instructions = AgentPromptTemplate::step_task(
                    goal,
                    &step.description,
                    completed,
                    feedback,
                    attempt.number,
                );
                let execution = self.execute_step(step, instructions).await?;
                if execution.summary.termination == Some(Termination::Cancelled) {
                    return Err(StepFailure::Cancelled);
                }

                let verdict = self
                    .verifier
                    .verify(step, &execution)
                    .await
                    .map_err(|e| {
                        if e.is_cancelled() {
                            StepFailure::Cancelled
                        } else {
                            StepFailure::Backend(e)
                        }
                    })?;
                services
                    .progress
                    .on_step_verified(step, verdict.passed, &verdict.feedback);

                if verdict.passed {
                    return Ok(execution.final_text);
                }
                warn!(step = %step.id, attempt = attempt.number, "Step rejected by verification");
                Err(StepFailure::Rejected(verdict.feedback))
            }
        })
        .await;

        let outcome = match result {
            Ok(retried) => {
                let text = retried.value;
                let result = text.clone();
                tracker.mark(|p| p.complete_step(index, result)).await;
                info!(step = %step.id, attempts = retried.attempts, "Step completed");
                StepOutcome::Completed(text)
            }
            Err(RetryError {
                error: StepFailure::Rejected(feedback),
                attempts,
                ..
            }) => {
                let recorded = feedback.clone();
                tracker.mark(|p| p.fail_step(index, recorded)).await;
                warn!(step = %step.id, attempts, "Step failed after exhausting its retry budget");
                StepOutcome::Failed(feedback)
            }
            Err(RetryError {
                error: StepFailure::Backend(error),
                ..
            }) => {
                let recorded = error.to_string();
                tracker.mark(|p| p.fail_step(index, recorded)).await;
                StepOutcome::Aborted(AbortCause::Backend {
                    step_id: step.id.clone(),
                    error,
                })
            }
            Err(RetryError {
                error: StepFailure::Cancelled,
                ..
            }) => {
                if tracker.step(index)?.status() == StepStatus::InProgress {
                    tracker.mark(|p| p.retry_step(index, "cancelled")).await;
                }
                StepOutcome::Aborted(AbortCause::Cancelled {
                    step_id: Some(step.id.clone()),
                })
            }
        };
        Ok(outcome)
    }

    /// One attempt: a fresh agent, routed when the step names an executor.
    async fn execute_step(
        &self,
        step: &Step,
        instructions: String,
    ) -> Result<StepExecution, StepFailure> {
        let result = match (&step.executor_tag, &self.sub_agents) {
            (Some(tag), Some(registry)) => {
                let descriptor = TaskDescriptor::new(&step.description).with_executor_tag(tag);
                registry
                    .spawn(&descriptor, instructions)
                    .await
                    .map(|report| StepExecution {
                        final_text: report.final_text,
                        summary: report.summary,
                    })
            }
            _ => {
                let task = AgentTask::new(
                    &step.id,
                    &self.step_prompt,
                    instructions,
                    self.executor.params().max_steps,
                );
                self.executor.run(task).await.map(|output| StepExecution {
                    final_text: output.final_text,
                    summary: output.summary,
                })
            }
        };

        match result {
            Ok(execution) => Ok(execution),
            Err(AgentRunError::Backend { source, .. }) if source.is_cancelled() => {
                Err(StepFailure::Cancelled)
            }
            Err(AgentRunError::Backend { source, .. }) => Err(StepFailure::Backend(source)),
            Err(other) => Err(StepFailure::Rejected(format!("the agent failed: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanningParams;
    use crate::ports::agent_progress::OrchestrationProgress;
    use crate::ports::conversation_logger::testing::RecordingLogger;
    use crate::ports::llm_gateway::GatewayError;
    use crate::retry::Backoff;
    use crate::use_cases::shared::AgentServices;
    use crate::use_cases::testing::{MockToolExecutor, RecordingPlanStore, ScriptedGateway};
    use stepwise_domain::routing::standard_variants;
    use stepwise_domain::{DecompositionBounds, LlmResponse, PlanStatus, RoutingTable};
    use tokio_util::sync::CancellationToken;

    const PLAN_ABC: &str = "```plan\n{\"steps\": [\"step a\", \"step b\", \"step c\"]}\n```";
    const PASS: &str = "Good.\n{\"grade\": \"PASS\"}";

    fn fail(reason: &str) -> String {
        format!("{}\n{{\"grade\": \"FAIL\"}}", reason)
    }

    fn params(policy: FailurePolicy) -> PlanningParams {
        PlanningParams::new(policy)
            .with_bounds(DecompositionBounds::new(3, 10).unwrap())
            .with_step_backoff(Backoff::None)
    }

    fn orchestrator(gateway: &ScriptedGateway, policy: FailurePolicy) -> PlanningOrchestrator {
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(gateway.clone())),
            Arc::new(MockToolExecutor::default()),
            "test-model",
        );
        PlanningOrchestrator::new(executor, params(policy))
    }

    fn last_user_prompt(request: &stepwise_domain::GenerationRequest) -> String {
        request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == stepwise_domain::Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_step_retried_with_feedback_until_verified() {
        let gateway = ScriptedGateway::texts([
                PLAN_ABC.to_string(),
                "a done".into(),
                PASS.into(),
                "b v1".into(),
                fail("missing the edge case"),
                "b v2".into(),
                fail("still missing the edge case"),
                "b v3".into(),
                PASS.into(),
                "c done".into(),
                PASS.into(),
        ]);
        let output = orchestrator(&gateway, FailurePolicy::Abort)
            .run("ship the feature")
            .await
            .unwrap();

        assert!(output.is_success());
        assert_eq!(output.plan.status(), PlanStatus::Completed);
        let step_b = output.plan.step(1).unwrap();
        assert_eq!(step_b.status(), StepStatus::Completed);
        assert_eq!(step_b.attempt_count(), 3);
        assert_eq!(step_b.result(), Some("b v3"));
        assert!(output.plan.steps().iter().all(|s| s.attempt_count() <= 3));

        let requests = gateway.requests();
        let second_attempt = last_user_prompt(&requests[5]);
        assert!(second_attempt.contains("missing the edge case"));
        assert!(second_attempt.contains("step b"));
        let step_c = last_user_prompt(&requests[9]);
        assert!(step_c.contains("a done"));
        assert!(step_c.contains("b v3"));
        assert_eq!(gateway.remaining(), 0);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_after_exhausted_step() {
        let mut script = vec![PLAN_ABC.to_string(), "a done".into(), PASS.into()];
        for i in 0..3 {
            script.push(format!("b v{}", i));
            script.push(fail("wrong output"));
        }
        let gateway = ScriptedGateway::texts(script);
        let output = orchestrator(&gateway, FailurePolicy::Abort)
            .run("goal")
            .await
            .unwrap();

        assert_eq!(output.plan.status(), PlanStatus::Aborted);
        assert_eq!(output.plan.step(1).unwrap().status(), StepStatus::Failed);
        assert_eq!(output.plan.step(1).unwrap().attempt_count(), 3);
        assert_eq!(output.plan.step(2).unwrap().status(), StepStatus::Pending);

        let report = output.abort.unwrap();
        assert!(matches!(report.cause, AbortCause::StepFailed { ref step_id, .. } if step_id == "step-2"));
        assert_eq!((report.completed_steps, report.total_steps), (1, 3));
        assert_eq!(gateway.remaining(), 0);
    }

    #[tokio::test]
    async fn test_negated_verifier_prose_does_not_complete_step() {
        let mut script = vec![PLAN_ABC.to_string()];
        for i in 0..3 {
            script.push(format!("a v{}", i));
            script.push("The added test still does not pass.".into());
        }
        let gateway = ScriptedGateway::texts(script);
        let output = orchestrator(&gateway, FailurePolicy::Abort)
            .run("goal")
            .await
            .unwrap();

        let step_a = output.plan.step(0).unwrap();
        assert_eq!(step_a.status(), StepStatus::Failed);
        assert_eq!(step_a.attempt_count(), 3);
        assert_eq!(output.plan.status(), PlanStatus::Aborted);
        assert_eq!(output.marking_failures, 0);
    }

    #[tokio::test]
    async fn test_skip_policy_continues_with_degraded_plan() {
        let mut script = vec![PLAN_ABC.to_string()];
        for i in 0..3 {
            script.push(format!("a v{}", i));
            script.push(fail("nope"));
        }
        script.extend(["b done".to_string(), PASS.into(), "c done".into(), PASS.into()]);
        let gateway = ScriptedGateway::texts(script);
        let output = orchestrator(&gateway, FailurePolicy::SkipAndContinue)
            .run("goal")
            .await
            .unwrap();

        assert!(output.is_success());
        assert_eq!(output.plan.status(), PlanStatus::CompletedWithFailures);
        assert_eq!(output.summary.count(StepStatus::Failed), 1);
        assert_eq!(output.summary.count(StepStatus::Completed), 2);
    }

    #[tokio::test]
    async fn test_decomposition_retried_then_rejected() {
        let gateway = ScriptedGateway::texts(["I'd rather not.", "{\"steps\": [\"only one\"]}"]);
        let err = orchestrator(&gateway, FailurePolicy::Abort)
            .run("goal")
            .await
            .unwrap_err();

        match err {
            PlanRunError::DecompositionFailed { attempts, reason } => {
                assert_eq!(attempts, 2);
                assert!(reason.contains("at least 3"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        let retry_prompt = last_user_prompt(&gateway.requests()[1]);
        assert!(retry_prompt.contains("previous answer was rejected"));
    }

    #[tokio::test]
    async fn test_oversized_decomposition_truncated() {
        let steps: Vec<String> = (1..=12).map(|i| format!("\"s{}\"", i)).collect();
        let plan = format!("{{\"steps\": [{}]}}", steps.join(","));
        let mut script = vec![plan];
        for _ in 0..10 {
            script.push("done".into());
            script.push(PASS.into());
        }
        let gateway = ScriptedGateway::texts(script);
        let output = orchestrator(&gateway, FailurePolicy::Abort)
            .run("goal")
            .await
            .unwrap();
        assert_eq!(output.plan.steps().len(), 10);
        assert_eq!(output.plan.status(), PlanStatus::Completed);
    }

    #[tokio::test]
    async fn test_fatal_backend_error_aborts_without_retry() {
        let gateway = ScriptedGateway::new(vec![
            Ok(LlmResponse::from_text(PLAN_ABC)),
            Err(GatewayError::Unavailable {
                attempts: 3,
                last: "connection refused".into(),
            }),
        ]);
        let output = orchestrator(&gateway, FailurePolicy::SkipAndContinue)
            .run("goal")
            .await
            .unwrap();

        let report = output.abort.unwrap();
        assert!(matches!(
            report.cause,
            AbortCause::Backend {
                error: GatewayError::Unavailable { .. },
                ..
            }
        ));
        assert_eq!(output.plan.status(), PlanStatus::Aborted);
        assert_eq!(output.plan.step(0).unwrap().attempt_count(), 1);
        assert_eq!(gateway.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_decomposition_backend_error_surfaces() {
        let gateway = ScriptedGateway::new(vec![Err(GatewayError::QuotaExceeded("daily".into()))]);
        let err = orchestrator(&gateway, FailurePolicy::Abort)
            .run("goal")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanRunError::Backend(GatewayError::QuotaExceeded(_))));
        assert_eq!(gateway.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failures_do_not_change_outcome() {
        let gateway = ScriptedGateway::texts([PLAN_ABC, "a", PASS, "b", PASS, "c", PASS]);
        let output = orchestrator(&gateway, FailurePolicy::Abort)
            .with_store(Arc::new(RecordingPlanStore::failing()))
            .run("goal")
            .await
            .unwrap();

        assert_eq!(output.plan.status(), PlanStatus::Completed);
        assert!(output.marking_failures > 0);
        assert!(output.summary.render().contains("could not be persisted"));
    }

    #[tokio::test]
    async fn test_transitions_are_persisted_in_order() {
        let gateway = ScriptedGateway::texts([PLAN_ABC, "a", PASS, "b", PASS, "c", PASS]);
        let store = Arc::new(RecordingPlanStore::default());
        orchestrator(&gateway, FailurePolicy::Abort)
            .with_store(store.clone())
            .run("goal")
            .await
            .unwrap();

        let transitions = store.transitions();
        assert_eq!(transitions.len(), 6);
        assert_eq!(transitions[0].to, StepStatus::InProgress);
        assert_eq!(transitions[1].to, StepStatus::Completed);
        assert_eq!(transitions[5].step_id, "step-3");
        assert_eq!(store.saves(), 2);
    }

    #[tokio::test]
    async fn test_structural_verification_needs_no_grading_call() {
        let gateway = ScriptedGateway::texts([PLAN_ABC, "a", "b", "c"]);
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(gateway.clone())),
            Arc::new(MockToolExecutor::default()),
            "test-model",
        );
        let output = PlanningOrchestrator::new(
            executor,
            params(FailurePolicy::Abort).with_verification(VerificationMode::Structural),
        )
        .run("goal")
        .await
        .unwrap();
        assert_eq!(output.plan.status(), PlanStatus::Completed);
        assert_eq!(gateway.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_tagged_steps_are_routed() {
        let plan = "{\"steps\": [{\"description\": \"write unit test\", \"executor\": \"test\"}, \"implement\", \"build it\"]}";
        let gateway = ScriptedGateway::texts([plan, "test added", PASS, "impl", PASS, "built", PASS]);
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(gateway.clone())),
            Arc::new(MockToolExecutor::default()),
            "test-model",
        );
        let registry = Arc::new(
            SubAgentRegistry::new(RoutingTable::standard(), standard_variants(), executor.clone())
                .unwrap(),
        );
        let output = PlanningOrchestrator::new(executor, params(FailurePolicy::Abort))
            .with_sub_agents(registry)
            .run("goal")
            .await
            .unwrap();

        assert!(output.is_success());
        let requests = gateway.requests();
        assert!(last_user_prompt(&requests[0]).contains("build, coding, test"));
        assert!(requests[1].messages[0].content.contains("You write and run tests"));
        assert!(!requests[3].messages[0].content.contains("You write and run tests"));
    }

    #[tokio::test]
    async fn test_executor_tag_outranks_description_keywords() {
        let plan = "{\"steps\": [{\"description\": \"document the API\", \"executor\": \"build\"}, {\"description\": \"add a test for the parser\", \"executor\": \"coding\"}, \"wrap up\"]}";
        let gateway = ScriptedGateway::texts([plan, "docs built", PASS, "parser done", PASS, "done", PASS]);
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(gateway.clone())),
            Arc::new(MockToolExecutor::default()),
            "test-model",
        );
        let registry = Arc::new(
            SubAgentRegistry::new(RoutingTable::standard(), standard_variants(), executor.clone())
                .unwrap(),
        );
        let output = PlanningOrchestrator::new(executor, params(FailurePolicy::Abort))
            .with_sub_agents(registry)
            .run("goal")
            .await
            .unwrap();

        assert!(output.is_success());
        let requests = gateway.requests();
        assert!(requests[1].messages[0].content.contains("You run builds"));
        assert!(requests[3].messages[0].content.contains("careful software engineer"));
        assert!(!requests[3].messages[0].content.contains("You write and run tests"));
    }

    struct CancelAfterFirstStep(CancellationToken);

    impl OrchestrationProgress for CancelAfterFirstStep {
        fn on_step_finished(&self, _step: &Step) {
            self.0.cancel();
        }
    }

    #[tokio::test]
    async fn test_cancellation_aborts_between_steps() {
        let token = CancellationToken::new();
        let gateway = ScriptedGateway::texts([PLAN_ABC, "a", PASS]);
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(gateway.clone()))
                .with_cancellation(token.clone())
                .with_progress(Arc::new(CancelAfterFirstStep(token))),
            Arc::new(MockToolExecutor::default()),
            "test-model",
        );
        let output = PlanningOrchestrator::new(executor, params(FailurePolicy::Abort))
            .run("goal")
            .await
            .unwrap();

        assert!(matches!(
            output.abort.unwrap().cause,
            AbortCause::Cancelled { step_id: Some(ref id) } if id == "step-2"
        ));
        assert_eq!(output.plan.step(0).unwrap().status(), StepStatus::Completed);
        assert_eq!(output.plan.step(1).unwrap().status(), StepStatus::Pending);
        assert_eq!(output.plan.step(1).unwrap().attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let gateway = ScriptedGateway::default();
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(gateway)).with_cancellation(token),
            Arc::new(MockToolExecutor::default()),
            "m",
        );
        let err = PlanningOrchestrator::new(executor, params(FailurePolicy::Abort))
            .run("goal")
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_summary_events_logged() {
        let gateway = ScriptedGateway::texts([PLAN_ABC, "a", PASS, "b", PASS, "c", PASS]);
        let logger = Arc::new(RecordingLogger::default());
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(gateway)).with_logger(logger.clone()),
            Arc::new(MockToolExecutor::default()),
            "m",
        );
        PlanningOrchestrator::new(executor, params(FailurePolicy::Abort))
            .run("goal")
            .await
            .unwrap();

        let types = logger.types();
        assert_eq!(types.first(), Some(&"plan_created"));
        assert_eq!(types.last(), Some(&"plan_summary"));
        assert_eq!(logger.of_type("step_transition").len(), 6);
        assert_eq!(logger.of_type("plan_summary")[0]["status"], "completed");
    }
}
