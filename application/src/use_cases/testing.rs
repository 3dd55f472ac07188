//! Scripted test doubles shared by the use case tests.

use crate::ports::checkpoint::{AgentSnapshot, CheckpointPort};
use crate::ports::llm_gateway::{GatewayError, GenerationObserver, LlmGateway};
use crate::ports::plan_store::{PlanStore, StoreError};
use crate::ports::tool_executor::ToolExecutorPort;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stepwise_domain::{
    GenerationRequest, LlmResponse, Plan, StepTransition, ToolCall, ToolDefinition, ToolError,
    ToolResult,
};

/// Replays queued responses in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    responses: Arc<Mutex<VecDeque<Result<LlmResponse, GatewayError>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    delay: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<Result<LlmResponse, GatewayError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            ..Default::default()
        }
    }

    pub fn texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|t| Ok(LlmResponse::from_text(t)))
                .collect(),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn generate(
        &self,
        request: GenerationRequest,
        observer: &dyn GenerationObserver,
    ) -> Result<LlmResponse, GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let stream = request.stream;
        self.requests.lock().unwrap().push(request);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::MalformedRequest("script exhausted".into())));
        if stream && let Ok(response) = &next {
            observer.on_text(&response.text_content());
        }
        next
    }
}

/// Answers with the first rule whose needle occurs in the last user message.
///
/// Used where calls run concurrently and queue order is not deterministic.
#[derive(Clone, Default)]
pub struct RuleGateway {
    rules: Vec<(String, Result<LlmResponse, GatewayError>)>,
    delays: Vec<(String, Duration)>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl RuleGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &str, text: &str) -> Self {
        self.rules
            .push((needle.to_string(), Ok(LlmResponse::from_text(text))));
        self
    }

    pub fn fail_on(mut self, needle: &str, error: GatewayError) -> Self {
        self.rules.push((needle.to_string(), Err(error)));
        self
    }

    pub fn delay_on(mut self, needle: &str, delay: Duration) -> Self {
        self.delays.push((needle.to_string(), delay));
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmGateway for RuleGateway {
    async fn generate(
        &self,
        request: GenerationRequest,
        _observer: &dyn GenerationObserver,
    ) -> Result<LlmResponse, GatewayError> {
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == stepwise_domain::Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        if let Some((_, delay)) = self.delays.iter().find(|(n, _)| prompt.contains(n)) {
            tokio::time::sleep(*delay).await;
        }
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Err(GatewayError::MalformedRequest(format!("no rule for: {prompt}"))))
    }
}

/// Records calls; unknown names fail like a real registry.
#[derive(Clone, Default)]
pub struct MockToolExecutor {
    names: Vec<String>,
    outputs: HashMap<String, String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockToolExecutor {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_output(mut self, name: &str, output: &str) -> Self {
        self.outputs.insert(name.to_string(), output.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutorPort for MockToolExecutor {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.names
            .iter()
            .map(|n| ToolDefinition::new(n.clone(), "mock capability"))
            .collect()
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if !self.names.contains(&call.tool_name) {
            return ToolResult::failure(
                &call.tool_name,
                &call.id,
                ToolError::not_found(&call.tool_name),
            );
        }
        self.calls.lock().unwrap().push(call.tool_name.clone());
        let output = self
            .outputs
            .get(&call.tool_name)
            .cloned()
            .unwrap_or_else(|| "ok".to_string());
        ToolResult::success(&call.tool_name, &call.id, output)
    }
}

#[derive(Default)]
pub struct RecordingCheckpoints {
    snapshots: Mutex<Vec<AgentSnapshot>>,
}

impl RecordingCheckpoints {
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckpointPort for RecordingCheckpoints {
    async fn save(&self, snapshot: &AgentSnapshot) -> Result<String, StoreError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        snapshots.push(snapshot.clone());
        Ok(format!("ckpt-{}", snapshots.len()))
    }

    async fn load_snapshot(&self, id: &str) -> Result<AgentSnapshot, StoreError> {
        id.strip_prefix("ckpt-")
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| self.snapshots().get(n.wrapping_sub(1)).cloned())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn latest_snapshot(&self, agent: &str) -> Result<Option<AgentSnapshot>, StoreError> {
        Ok(self.snapshots().into_iter().rev().find(|s| s.agent == agent))
    }
}

/// Records transitions; optionally fails every write.
#[derive(Default)]
pub struct RecordingPlanStore {
    transitions: Mutex<Vec<StepTransition>>,
    saves: Mutex<usize>,
    failing: bool,
}

impl RecordingPlanStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn transitions(&self) -> Vec<StepTransition> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl PlanStore for RecordingPlanStore {
    async fn save_plan(&self, _plan: &Plan) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Io("disk full".into()));
        }
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn record_transition(
        &self,
        _plan: &Plan,
        transition: &StepTransition,
    ) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Io("disk full".into()));
        }
        self.transitions.lock().unwrap().push(transition.clone());
        Ok(())
    }
}
