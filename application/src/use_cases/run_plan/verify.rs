//! Step result verification

use crate::ports::llm_gateway::{GatewayError, LlmGateway, NoObserver};
use async_trait::async_trait;
use std::sync::Arc;
use stepwise_domain::{
    AgentLifecycle, AgentPromptTemplate, GenerationRequest, Grade, Message, RunSummary,
    SamplingParams, Step, parse_grade,
};
use tracing::debug;

/// What the agent produced for one attempt of a step.
#[derive(Debug, Clone)]
pub struct StepExecution {
    pub final_text: String,
    pub summary: RunSummary,
}

/// Verification outcome; `feedback` explains a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub feedback: String,
}

impl Verdict {
    pub fn pass(feedback: impl Into<String>) -> Self {
        Self {
            passed: true,
            feedback: feedback.into(),
        }
    }

    pub fn fail(feedback: impl Into<String>) -> Self {
        Self {
            passed: false,
            feedback: feedback.into(),
        }
    }
}

/// Judges whether a step's result satisfies the step.
#[async_trait]
pub trait StepVerifier: Send + Sync {
    async fn verify(&self, step: &Step, execution: &StepExecution)
    -> Result<Verdict, GatewayError>;
}

/// Accepts any run that finished untruncated with a non-empty answer.
pub struct StructuralVerifier;

impl StructuralVerifier {
    fn check(execution: &StepExecution) -> Verdict {
        let summary = &execution.summary;
        if summary.lifecycle != AgentLifecycle::Finished {
            return Verdict::fail(format!("the agent ended in state {}", summary.lifecycle));
        }
        if summary.truncated {
            let reason = summary
                .termination
                .map(|t| t.to_string())
                .unwrap_or_else(|| "truncated".to_string());
            return Verdict::fail(format!(
                "the agent stopped before finishing ({}) after {} of {} steps",
                reason, summary.steps, summary.max_steps
            ));
        }
        if execution.final_text.trim().is_empty() {
            return Verdict::fail("the agent produced no result");
        }
        Verdict::pass("structural check passed")
    }
}

#[async_trait]
impl StepVerifier for StructuralVerifier {
    async fn verify(
        &self,
        _step: &Step,
        execution: &StepExecution,
    ) -> Result<Verdict, GatewayError> {
        Ok(Self::check(execution))
    }
}

/// Structural check first, then a graded model review of the result.
///
/// The verification request carries no capability schema, so identical
/// verifications are served from the gateway cache.
pub struct ModelVerifier {
    gateway: Arc<dyn LlmGateway>,
    model: String,
    sampling: SamplingParams,
}

impl ModelVerifier {
    pub fn new(gateway: Arc<dyn LlmGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
            sampling: SamplingParams::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }
}

#[async_trait]
impl StepVerifier for ModelVerifier {
    async fn verify(
        &self,
        step: &Step,
        execution: &StepExecution,
    ) -> Result<Verdict, GatewayError> {
        let structural = StructuralVerifier::check(execution);
        if !structural.passed {
            return Ok(structural);
        }

        let prompt = AgentPromptTemplate::step_verification(&step.description, &execution.final_text);
        let request = GenerationRequest::new(&self.model)
            .with_message(Message::user(prompt))
            .with_params(self.sampling.clone());
        let response = self.gateway.generate(request, &NoObserver).await?;
        let text = response.text_content();
        let grade = parse_grade(&text);
        debug!(step = %step.id, grade = %grade, "Step verified");

        Ok(Verdict {
            passed: grade.effective() == Grade::Pass,
            feedback: text,
        })
    }
}
