//! Goal decomposition with bounded, feedback-driven retries

use super::types::PlanRunError;
use crate::ports::llm_gateway::{GatewayError, NoObserver};
use crate::retry::{RetryPolicy, retry_with};
use crate::use_cases::execute_agent::AgentExecutor;
use stepwise_domain::plan::Fitted;
use stepwise_domain::{
    AgentPromptTemplate, DecompositionBounds, GenerationRequest, Message, StepDraft,
    parse_decomposition,
};
use tracing::{debug, warn};

#[derive(Debug)]
enum DecomposeFailure {
    Rejected(String),
    Backend(GatewayError),
}

/// Ask the model for a step list until it parses and fits `bounds`.
///
/// A rejected answer is fed back into the next prompt, which also keeps the
/// retry from being answered out of the gateway cache.
pub(super) async fn decompose(
    executor: &AgentExecutor,
    goal: &str,
    bounds: DecompositionBounds,
    executor_tags: &[&str],
    attempts: usize,
) -> Result<Fitted<StepDraft>, PlanRunError> {
    let policy = RetryPolicy::immediate(attempts);

    let result = retry_with(
        &policy,
        |failure: &DecomposeFailure| matches!(failure, DecomposeFailure::Rejected(_)),
        |attempt| async move {
            let feedback = match &attempt.previous {
                Some(DecomposeFailure::Rejected(reason)) => Some(reason.clone()),
                _ => None,
            };
            let prompt =
                AgentPromptTemplate::decomposition(goal, bounds, executor_tags, feedback.as_deref());
            let request = GenerationRequest::new(executor.model())
                .with_message(Message::user(prompt))
                .with_params(executor.sampling().clone());

            let response = executor
                .services()
                .gateway
                .generate(request, &NoObserver)
                .await
                .map_err(DecomposeFailure::Backend)?;

            let drafts = parse_decomposition(&response.text_content()).ok_or_else(|| {
                DecomposeFailure::Rejected(
                    "the answer did not contain a parsable step list".to_string(),
                )
            })?;
            let fitted = bounds
                .fit(drafts)
                .map_err(|e| DecomposeFailure::Rejected(e.to_string()))?;
            if fitted.dropped > 0 {
                warn!(
                    dropped = fitted.dropped,
                    max = bounds.max(),
                    "Decomposition exceeded the step limit, trailing steps dropped"
                );
            }
            debug!(attempt = attempt.number, steps = fitted.steps.len(), "Decomposition accepted");
            Ok(fitted)
        },
    )
    .await;

    match result {
        Ok(retried) => Ok(retried.value),
        Err(failure) => match failure.error {
            DecomposeFailure::Backend(e) => Err(PlanRunError::Backend(e)),
            DecomposeFailure::Rejected(reason) => Err(PlanRunError::DecompositionFailed {
                attempts: failure.attempts,
                reason,
            }),
        },
    }
}
