//! Review orchestrator: a bounded produce → critique → revise loop
//!
//! The producer writes (or revises) an artifact, the reviewer grades it
//! against a checklist. A pass ends the loop; a failed grade feeds the
//! critique into the next revision. Running out of iterations is a normal
//! outcome reported through [`ReviewOutput::passed`], not an error.

use crate::config::ReviewParams;
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::llm_gateway::GatewayError;
use crate::retry::{RetryError, RetryPolicy, retry_with};
use crate::use_cases::execute_agent::{AgentExecutor, AgentRunError, AgentTask};
use serde_json::json;
use std::sync::{Mutex, PoisonError};
use stepwise_domain::{Checklist, ReviewCycle, ReviewPromptTemplate, parse_grade};
use thiserror::Error;
use tracing::{info, warn};

const PRODUCER_PROMPT: &str = "You produce artifacts for a reviewer. Reply with the complete \
artifact every time, never a diff or a partial excerpt.";

/// Errors that end a review before any verdict is reached
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Backend error during review: {0}")]
    Backend(#[source] GatewayError),

    #[error("Review agent failed: {0}")]
    Agent(#[source] AgentRunError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ReviewError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReviewError::Cancelled)
    }
}

impl From<AgentRunError> for ReviewError {
    fn from(error: AgentRunError) -> Self {
        match error {
            AgentRunError::Backend { source, .. } if source.is_cancelled() => ReviewError::Cancelled,
            AgentRunError::Backend { source, .. } => ReviewError::Backend(source),
            other => ReviewError::Agent(other),
        }
    }
}

/// Result of a review loop.
#[derive(Debug, Clone)]
pub struct ReviewOutput {
    /// The last artifact produced, passed or not.
    pub artifact: String,
    pub passed: bool,
    pub iterations: usize,
    pub cycles: Vec<ReviewCycle>,
    /// Reviewer commentary on the last artifact.
    pub final_critique: String,
}

enum CycleFailure {
    Rejected(ReviewCycle),
    Fatal(ReviewError),
}

/// Runs the Doer-Critic loop between a producing and a reviewing agent.
pub struct ReviewOrchestrator {
    producer: AgentExecutor,
    reviewer: AgentExecutor,
    params: ReviewParams,
    producer_prompt: String,
}

impl ReviewOrchestrator {
    pub fn new(producer: AgentExecutor, reviewer: AgentExecutor, params: ReviewParams) -> Self {
        Self {
            producer,
            reviewer,
            params,
            producer_prompt: PRODUCER_PROMPT.to_string(),
        }
    }

    pub fn with_producer_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.producer_prompt = prompt.into();
        self
    }

    pub async fn run(&self, task: &str, checklist: &Checklist) -> Result<ReviewOutput, ReviewError> {
        let max_iterations = self.params.max_iterations.max(1);
        let policy = RetryPolicy::immediate(max_iterations);
        let cycles: Mutex<Vec<ReviewCycle>> = Mutex::new(Vec::new());
        let reviewer_system = ReviewPromptTemplate::reviewer_system(checklist);
        info!(max_iterations, criteria = checklist.criteria().len(), "Starting review loop");

        let result = retry_with(
            &policy,
            |failure: &CycleFailure| matches!(failure, CycleFailure::Rejected(_)),
            |attempt| {
                let cycles = &cycles;
                let reviewer_system = reviewer_system.as_str();
                async move {
                    let services = self.producer.services();
                    if services.is_cancelled() {
                        return Err(CycleFailure::Fatal(ReviewError::Cancelled));
                    }
                    let iteration = attempt.number - 1;
                    let (previous, feedback) = match &attempt.previous {
                        Some(CycleFailure::Rejected(cycle)) => {
                            (Some(cycle.artifact.as_str()), Some(cycle.feedback.as_str()))
                        }
                        _ => (None, None),
                    };

                    let produce = AgentTask::new(
                        "producer",
                        &self.producer_prompt,
                        ReviewPromptTemplate::producer(task, previous, feedback),
                        self.producer.params().max_steps,
                    );
                    let artifact = self
                        .producer
                        .run(produce)
                        .await
                        .map_err(|e| CycleFailure::Fatal(e.into()))?
                        .final_text;

                    let review = AgentTask::new(
                        "reviewer",
                        reviewer_system,
                        ReviewPromptTemplate::review_request(task, &artifact),
                        self.reviewer.params().max_steps,
                    );
                    let critique = self
                        .reviewer
                        .run(review)
                        .await
                        .map_err(|e| CycleFailure::Fatal(e.into()))?
                        .final_text;

                    let cycle = ReviewCycle {
                        iteration,
                        grade: parse_grade(&critique),
                        artifact,
                        feedback: critique,
                    };
                    services.progress.on_review_cycle(&cycle);
                    services.logger.log(ConversationEvent::new(
                        "review_cycle",
                        json!({
                            "iteration": cycle.iteration,
                            "grade": cycle.grade,
                            "passed": cycle.passed(),
                            "artifact_chars": cycle.artifact.chars().count(),
                        }),
                    ));
                    info!(iteration, grade = %cycle.grade, "Review cycle finished");
                    cycles
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(cycle.clone());

                    if cycle.passed() {
                        Ok(cycle)
                    } else {
                        Err(CycleFailure::Rejected(cycle))
                    }
                }
            },
        )
        .await;

        let cycles = cycles.into_inner().unwrap_or_else(PoisonError::into_inner);
        let last = match result {
            Ok(retried) => retried.value,
            Err(RetryError {
                error: CycleFailure::Rejected(cycle),
                attempts,
                ..
            }) => {
                warn!(attempts, "Review budget exhausted without a passing grade");
                cycle
            }
            Err(RetryError {
                error: CycleFailure::Fatal(error),
                ..
            }) => return Err(error),
        };

        Ok(ReviewOutput {
            passed: last.passed(),
            iterations: cycles.len(),
            artifact: last.artifact,
            final_critique: last.feedback,
            cycles,
        })
    }
}
