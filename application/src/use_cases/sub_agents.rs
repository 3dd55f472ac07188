//! Sub-agent routing and spawning
//!
//! A parent hands a [`TaskDescriptor`] to the [`SubAgentRegistry`], which
//! routes it to an [`AgentVariant`], builds a fresh agent scoped to that
//! variant's capabilities and budget, runs it, and returns only a compact
//! [`SubAgentReport`]. The child's transcript never reaches the parent.

use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::execute_agent::{AgentExecutor, AgentRunError, AgentTask};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use stepwise_domain::tool::reserved::is_reserved;
use stepwise_domain::{
    AgentVariant, ConfigIssue, RouteDecision, RoutingTable, RunSummary, TaskDescriptor, ToolCall,
    ToolDefinition, ToolError, ToolResult,
};
use stepwise_domain::config::ConfigIssueCode;
use tokio::time::Instant;
use tracing::{debug, info};

/// Restricts an executor to an allow-list of capability names.
///
/// Reserved capabilities are always reachable.
pub struct ScopedToolExecutor {
    inner: Arc<dyn ToolExecutorPort>,
    allowed: Option<HashSet<String>>,
}

impl ScopedToolExecutor {
    pub fn new(inner: Arc<dyn ToolExecutorPort>, allowed: Option<Vec<String>>) -> Self {
        Self {
            inner,
            allowed: allowed.map(|names| names.into_iter().collect()),
        }
    }

    fn allows(&self, name: &str) -> bool {
        is_reserved(name)
            || self
                .allowed
                .as_ref()
                .is_none_or(|names| names.contains(name))
    }
}

#[async_trait]
impl ToolExecutorPort for ScopedToolExecutor {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.inner
            .definitions()
            .into_iter()
            .filter(|d| self.allows(&d.name))
            .collect()
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if !self.allows(&call.tool_name) {
            return ToolResult::failure(
                &call.tool_name,
                &call.id,
                ToolError::not_found(format!(
                    "capability '{}' is not available to this agent",
                    call.tool_name
                )),
            );
        }
        self.inner.execute(call).await
    }
}

/// What a parent learns from a sub-agent.
#[derive(Debug, Clone, Serialize)]
pub struct SubAgentReport {
    pub variant: String,
    pub matched_rule: Option<usize>,
    pub final_text: String,
    pub summary: RunSummary,
}

impl SubAgentReport {
    /// Finished with an answer and without truncation.
    pub fn is_complete(&self) -> bool {
        !self.summary.truncated && !self.final_text.trim().is_empty()
    }
}

/// Routing table plus the variants it can route to.
pub struct SubAgentRegistry {
    table: RoutingTable,
    variants: HashMap<String, AgentVariant>,
    executor: AgentExecutor,
}

impl SubAgentRegistry {
    /// Fails when the table names a variant that is not registered.
    pub fn new(
        table: RoutingTable,
        variants: Vec<AgentVariant>,
        executor: AgentExecutor,
    ) -> Result<Self, ConfigIssue> {
        let variants: HashMap<String, AgentVariant> = variants
            .into_iter()
            .map(|v| (v.name.clone(), v))
            .collect();
        if let Some(missing) = table
            .variant_names()
            .into_iter()
            .find(|name| !variants.contains_key(*name))
        {
            return Err(ConfigIssue::error(
                ConfigIssueCode::UnknownVariant {
                    variant: missing.to_string(),
                },
                format!("routing table refers to unknown variant '{}'", missing),
            ));
        }
        Ok(Self {
            table,
            variants,
            executor,
        })
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn variant(&self, name: &str) -> Option<&AgentVariant> {
        self.variants.get(name)
    }

    /// Registered variant names, sorted.
    pub fn variant_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variants.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Pure routing decision for `descriptor`.
    pub fn route(&self, descriptor: &TaskDescriptor) -> RouteDecision {
        self.table.route(descriptor)
    }

    pub async fn spawn(
        &self,
        descriptor: &TaskDescriptor,
        instructions: impl Into<String>,
    ) -> Result<SubAgentReport, AgentRunError> {
        self.spawn_until(descriptor, instructions.into(), None).await
    }

    /// Spawn with an optional wall-clock deadline.
    pub async fn spawn_until(
        &self,
        descriptor: &TaskDescriptor,
        instructions: String,
        deadline: Option<Instant>,
    ) -> Result<SubAgentReport, AgentRunError> {
        let decision = self.route(descriptor);
        if decision.is_fallback() {
            debug!(
                descriptor = %descriptor.description,
                variant = %decision.variant,
                "No routing rule matched, using default variant"
            );
        }
        let variant = self
            .variants
            .get(&decision.variant)
            .ok_or_else(|| AgentRunError::UnknownVariant(decision.variant.clone()))?;

        let max_steps = decision.max_steps.unwrap_or(variant.max_steps);
        let tools = ScopedToolExecutor::new(self.executor.tools(), variant.capabilities.clone());
        let executor = self.executor.with_tools(Arc::new(tools));

        info!(variant = %variant.name, max_steps, "Spawning sub-agent");
        let mut task = AgentTask::new(
            &variant.name,
            &variant.system_prompt,
            instructions,
            max_steps,
        );
        task.deadline = deadline;

        let output = executor.run(task).await?;
        Ok(SubAgentReport {
            variant: variant.name.clone(),
            matched_rule: decision.matched_rule,
            final_text: output.final_text,
            summary: output.summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::shared::AgentServices;
    use crate::use_cases::testing::{MockToolExecutor, ScriptedGateway};
    use serde_json::json;
    use stepwise_domain::routing::standard_variants;
    use stepwise_domain::{LlmResponse, MatchRule, RoutingRule, Termination};

    fn registry(gateway: ScriptedGateway, tools: MockToolExecutor) -> SubAgentRegistry {
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(gateway)),
            Arc::new(tools),
            "test-model",
        );
        SubAgentRegistry::new(RoutingTable::standard(), standard_variants(), executor).unwrap()
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let table = RoutingTable::new("coding")
            .with_rule(RoutingRule::new(MatchRule::keyword("deploy"), "ops"));
        let executor = AgentExecutor::new(
            AgentServices::new(Arc::new(ScriptedGateway::default())),
            Arc::new(MockToolExecutor::default()),
            "m",
        );
        let err = SubAgentRegistry::new(table, standard_variants(), executor)
            .err()
            .unwrap();
        assert!(err.is_error());
        assert!(err.message.contains("ops"));
    }

    #[tokio::test]
    async fn test_spawn_routes_and_reports_without_transcript() {
        let gateway = ScriptedGateway::texts(["tests written"]);
        let reg = registry(gateway.clone(), MockToolExecutor::default());

        let report = reg
            .spawn(&TaskDescriptor::new("write unit test for parser"), "do it")
            .await
            .unwrap();

        assert_eq!(report.variant, "test");
        let matched = &reg.table().rules()[report.matched_rule.unwrap()];
        assert_eq!(matched.rule, MatchRule::keyword("test"));
        assert_eq!(report.final_text, "tests written");
        assert_eq!(report.summary.termination, Some(Termination::FinalAnswer));
        assert!(report.is_complete());

        let requests = gateway.requests();
        let system = &requests[0].messages[0].content;
        assert!(system.contains("test"));
    }

    #[tokio::test]
    async fn test_fallback_to_default_variant() {
        let reg = registry(ScriptedGateway::texts(["done"]), MockToolExecutor::default());
        let report = reg
            .spawn(&TaskDescriptor::new("update README wording"), "go")
            .await
            .unwrap();
        assert_eq!(report.variant, "coding");
        assert_eq!(report.matched_rule, None);
    }

    #[tokio::test]
    async fn test_variant_budget_applies() {
        let looping =
            || Ok(LlmResponse::from_text("").with_tool_use("t", "read_file", json!({})));
        let gateway = ScriptedGateway::new((0..20).map(|_| looping()).collect());
        let reg = registry(gateway, MockToolExecutor::new(&["read_file"]));

        let build_budget = reg.variant("build").unwrap().max_steps;
        let report = reg
            .spawn(&TaskDescriptor::new("build the release"), "go")
            .await
            .unwrap();
        assert_eq!(report.summary.max_steps, build_budget);
        assert!(report.summary.truncated);
    }

    #[tokio::test]
    async fn test_scoped_executor_hides_other_capabilities() {
        let inner = MockToolExecutor::new(&["read_file", "run_command", "terminate"]);
        let scoped = ScopedToolExecutor::new(Arc::new(inner.clone()), Some(vec!["read_file".into()]));

        let names: Vec<_> = scoped.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["read_file", "terminate"]);

        let denied = scoped.execute(&ToolCall::new("run_command")).await;
        assert!(denied.is_error);
        assert!(inner.calls().is_empty());
    }
}
