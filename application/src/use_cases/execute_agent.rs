//! Executing-agent use case
//!
//! One agent run is a bounded think/act loop over an explicit
//! [`AgentRunState`]:
//!
//! ```text
//! start ─▶ [cancelled? deadline? budget?] ─▶ think (gateway) ─▶ no calls ─▶ Finished(final answer)
//!               ▲                                   │
//!               │                                   ▼
//!               └──────────── act (dispatch each call, append results)
//!                                                   │
//!                                       terminate ──┴─▶ Finished(terminate requested)
//! ```
//!
//! Budget exhaustion, cancellation and wall-clock expiry all finish the run
//! normally with a truncation marker. Only backend failures move it to
//! `Error`.

use crate::config::AgentParams;
use crate::ports::checkpoint::{AgentSnapshot, SnapshotReason};
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::llm_gateway::{GatewayError, NoObserver};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::shared::AgentServices;
use serde_json::json;
use std::sync::Arc;
use stepwise_domain::agent::stuck::STUCK_HINT;
use stepwise_domain::agent::summary::FINAL_PREVIEW_CHARS;
use stepwise_domain::core::string::preview;
use stepwise_domain::tool::reserved::is_terminate;
use stepwise_domain::{
    AgentPromptTemplate, AgentRunState, DomainError, GenerationRequest, Message, RunSummary,
    Role, SamplingParams, StuckDetector, Termination, ToolCall, ToolDefinition,
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors that end an agent run in the `Error` state
#[derive(Error, Debug)]
pub enum AgentRunError {
    #[error("Backend failure in agent '{agent}' at step {step}: {source}")]
    Backend {
        agent: String,
        step: usize,
        #[source]
        source: GatewayError,
        summary: Box<RunSummary>,
    },

    #[error("Agent state error: {0}")]
    State(#[from] DomainError),

    #[error("Unknown agent variant: {0}")]
    UnknownVariant(String),
}

impl AgentRunError {
    /// The gateway error behind a backend failure.
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            AgentRunError::Backend { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Input of one agent run.
#[derive(Debug, Clone)]
pub struct AgentTask {
    /// Agent or variant name, used in logs and snapshots.
    pub name: String,
    pub system_prompt: String,
    pub instructions: String,
    pub max_steps: usize,
    /// Wall-clock limit; reaching it finishes the run as truncated.
    pub deadline: Option<Instant>,
}

impl AgentTask {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        instructions: impl Into<String>,
        max_steps: usize,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            instructions: instructions.into(),
            max_steps,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Result of a run that reached `Finished`.
#[derive(Debug, Clone)]
pub struct AgentRunOutput {
    pub state: AgentRunState,
    pub summary: RunSummary,
    /// Terminate summary if one was given, else the last assistant text.
    pub final_text: String,
}

impl AgentRunOutput {
    pub fn termination(&self) -> Option<Termination> {
        self.state.termination()
    }
}

/// Runs agents against a gateway and a capability set.
#[derive(Clone)]
pub struct AgentExecutor {
    services: AgentServices,
    tools: Arc<dyn ToolExecutorPort>,
    model: String,
    sampling: SamplingParams,
    params: AgentParams,
}

enum Act {
    Continue,
    Terminate(Option<String>),
}

impl AgentExecutor {
    pub fn new(
        services: AgentServices,
        tools: Arc<dyn ToolExecutorPort>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            services,
            tools,
            model: model.into(),
            sampling: SamplingParams::default(),
            params: AgentParams::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_params(mut self, params: AgentParams) -> Self {
        self.params = params;
        self
    }

    /// Same executor with a different capability set.
    pub fn with_tools(&self, tools: Arc<dyn ToolExecutorPort>) -> Self {
        Self {
            tools,
            ..self.clone()
        }
    }

    pub fn services(&self) -> &AgentServices {
        &self.services
    }

    pub fn tools(&self) -> Arc<dyn ToolExecutorPort> {
        Arc::clone(&self.tools)
    }

    pub fn params(&self) -> &AgentParams {
        &self.params
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    /// Run one agent to a terminal state.
    pub async fn run(&self, task: AgentTask) -> Result<AgentRunOutput, AgentRunError> {
        let tools = self.tools.definitions();
        let max_steps = self.params.effective_max_steps(task.max_steps);
        let system = AgentPromptTemplate::agent_system(&task.system_prompt, &tools);
        let state = AgentRunState::new(
            max_steps,
            vec![
                Message::system(system),
                Message::user(task.instructions.clone()),
            ],
        );
        self.drive(&task, state).await
    }

    /// Continue a checkpointed run from its saved transcript and step
    /// counter. The saved budget still applies.
    pub async fn resume(&self, snapshot: AgentSnapshot) -> Result<AgentRunOutput, AgentRunError> {
        let state = snapshot.state.reopen();
        info!(
            agent = %snapshot.agent,
            step = state.step(),
            max_steps = state.max_steps(),
            messages = state.transcript().len(),
            "Resuming agent from checkpoint"
        );
        let task = AgentTask::new(snapshot.agent, "", snapshot.task, state.max_steps());
        self.drive(&task, state).await
    }

    async fn drive(
        &self,
        task: &AgentTask,
        mut state: AgentRunState,
    ) -> Result<AgentRunOutput, AgentRunError> {
        let tools = self.tools.definitions();
        let max_steps = state.max_steps();
        state.start()?;
        info!(agent = %task.name, max_steps, tools = tools.len(), "Agent started");

        let detector = StuckDetector::new(self.params.duplicate_threshold);
        let mut terminate_summary = None;

        loop {
            if self.services.is_cancelled() {
                info!(agent = %task.name, step = state.step(), "Agent cancelled");
                state.finish(Termination::Cancelled)?;
                break;
            }
            if task.deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(agent = %task.name, step = state.step(), "Agent wall-clock limit reached");
                state.finish(Termination::WallClockExceeded)?;
                break;
            }
            if !state.has_budget() {
                warn!(
                    agent = %task.name,
                    max_steps,
                    "Agent step budget exhausted, finishing with truncated result"
                );
                state.finish(Termination::StepBudgetExhausted)?;
                break;
            }

            let step = state.begin_step()?;
            self.services
                .progress
                .on_agent_step(&task.name, step, max_steps);

            if detector.is_stuck(state.transcript()) && !hint_pending(state.transcript()) {
                debug!(agent = %task.name, step, "Duplicate responses detected");
                state.push(Message::user(STUCK_HINT));
            }

            // Think
            let request = GenerationRequest::new(&self.model)
                .with_messages(state.transcript().to_vec())
                .with_params(self.sampling.clone())
                .with_tools(tools.clone());

            let generation = self.services.gateway.generate(request, &NoObserver);
            let response = match task.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, generation).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(agent = %task.name, step, "Agent wall-clock limit reached mid-call");
                        state.finish(Termination::WallClockExceeded)?;
                        break;
                    }
                },
                None => generation.await,
            };
            let response = match response {
                Ok(response) => response,
                Err(e) => return Err(self.fail(task, state, step, e).await),
            };

            let calls = response.tool_calls();
            state.push(response.to_message());
            if calls.is_empty() {
                state.finish(Termination::FinalAnswer)?;
                break;
            }

            // Act
            match self.act(&task.name, &mut state, calls).await {
                Act::Continue => {}
                Act::Terminate(summary) => {
                    terminate_summary = summary;
                    state.finish(Termination::TerminateRequested)?;
                    break;
                }
            }

            if let Some(interval) = self.params.checkpoint_interval
                && step % interval == 0
            {
                self.checkpoint(task, &state, SnapshotReason::Interval).await;
            }
        }

        let final_text = terminate_summary
            .or_else(|| state.final_text().map(str::to_string))
            .unwrap_or_default();
        let mut summary = RunSummary::from_state(&state);
        summary.final_preview = preview(&final_text, FINAL_PREVIEW_CHARS);

        info!(agent = %task.name, "{}", summary);
        self.services.progress.on_agent_finished(&task.name, &summary);

        Ok(AgentRunOutput {
            state,
            summary,
            final_text,
        })
    }

    /// Dispatch the calls of one turn in order.
    ///
    /// A terminate call wins over everything else in the same turn: the
    /// other calls are answered as skipped so every call id gets a result.
    async fn act(&self, agent: &str, state: &mut AgentRunState, calls: Vec<ToolCall>) -> Act {
        if let Some(terminate) = calls.iter().find(|c| is_terminate(&c.tool_name)) {
            let result = self.tools.execute(terminate).await;
            self.log_call(agent, terminate, result.is_error);
            for call in &calls {
                let content = if call.id == terminate.id {
                    result.to_transcript_content()
                } else {
                    "[skipped] agent terminated".to_string()
                };
                state.push(Message::tool(&call.id, content));
            }
            let summary = terminate
                .get_string("summary")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            info!(agent, skipped = calls.len() - 1, "Agent requested termination");
            return Act::Terminate(summary);
        }

        for call in &calls {
            self.services.progress.on_tool_call(agent, &call.tool_name);
            let result = self.tools.execute(call).await;
            if result.is_error {
                debug!(agent, tool = %call.tool_name, "Capability returned an error result");
            }
            self.services
                .progress
                .on_tool_result(agent, &call.tool_name, !result.is_error);
            self.log_call(agent, call, result.is_error);
            state.push(Message::tool(&call.id, result.to_transcript_content()));
        }
        Act::Continue
    }

    fn log_call(&self, agent: &str, call: &ToolCall, is_error: bool) {
        self.services.logger.log(ConversationEvent::new(
            "capability_call",
            json!({
                "agent": agent,
                "tool": call.tool_name,
                "call_id": call.id,
                "arguments": call.arguments,
                "is_error": is_error,
            }),
        ));
    }

    async fn fail(
        &self,
        task: &AgentTask,
        mut state: AgentRunState,
        step: usize,
        error: GatewayError,
    ) -> AgentRunError {
        warn!(agent = %task.name, step, error = %error, "Agent failed on backend error");
        if let Err(e) = state.fail(error.to_string()) {
            return AgentRunError::State(e);
        }
        self.checkpoint(task, &state, SnapshotReason::Error).await;
        AgentRunError::Backend {
            agent: task.name.clone(),
            step,
            source: error,
            summary: Box::new(RunSummary::from_state(&state)),
        }
    }

    async fn checkpoint(&self, task: &AgentTask, state: &AgentRunState, reason: SnapshotReason) {
        let snapshot = AgentSnapshot::new(&task.name, &task.instructions, reason, state.clone());
        match self.services.checkpoints.save(&snapshot).await {
            Ok(id) if !id.is_empty() => {
                debug!(agent = %task.name, checkpoint = %id, "Checkpoint saved")
            }
            Ok(_) => {}
            Err(e) => warn!(agent = %task.name, error = %e, "Failed to save checkpoint"),
        }
    }

    /// Definitions this executor advertises to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }
}

/// The hint was already injected during the current run of repeated answers.
///
/// Walks back until the hint or an assistant message that breaks the
/// repetition, so each stuck episode gets the hint once.
fn hint_pending(transcript: &[Message]) -> bool {
    let Some(repeated) = transcript.iter().rev().find(|m| m.role == Role::Assistant) else {
        return false;
    };
    for message in transcript.iter().rev() {
        match message.role {
            Role::User if message.content == STUCK_HINT => return true,
            Role::Assistant if message.content != repeated.content => return false,
            _ => {}
        }
    }
    false
}
