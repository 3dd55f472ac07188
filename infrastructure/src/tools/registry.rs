//! Name-indexed capability table

use super::builtin::TerminateCapability;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use stepwise_application::ports::tool_executor::ToolExecutorPort;
use stepwise_domain::{
    Capability, DefaultToolValidator, ToolCall, ToolDefinition, ToolError, ToolResult,
    ToolValidator,
};
use tracing::{debug, warn};

/// Registry of capabilities, dispatched by name.
///
/// `terminate` is always present. Registering a capability under a name
/// that is already taken replaces the earlier one.
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
    /// Registration order, for stable definition listings
    order: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
            order: Vec::new(),
        }
        .register(TerminateCapability)
    }

    pub fn register<C: Capability + 'static>(self, capability: C) -> Self {
        self.register_arc(Arc::new(capability))
    }

    pub fn register_arc(mut self, capability: Arc<dyn Capability>) -> Self {
        let name = capability.name();
        if self.capabilities.insert(name.clone(), capability).is_some() {
            debug!(capability = %name, "Replaced registered capability");
        } else {
            self.order.push(name);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutorPort for CapabilityRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.capabilities.get(name))
            .map(|c| c.definition())
            .collect()
    }

    fn has_tool(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(capability) = self.capabilities.get(&call.tool_name) else {
            debug!(capability = %call.tool_name, "Unknown capability requested");
            return ToolResult::failure(
                &call.tool_name,
                &call.id,
                ToolError::not_found(format!("capability '{}'", call.tool_name)),
            );
        };

        if let Err(e) = DefaultToolValidator.validate(call, &capability.definition()) {
            return ToolResult::failure(&call.tool_name, &call.id, e);
        }

        match AssertUnwindSafe(capability.execute(call)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(capability = %call.tool_name, %message, "Capability panicked");
                ToolResult::failure(
                    &call.tool_name,
                    &call.id,
                    ToolError::execution_failed(format!("capability panicked: {}", message)),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_domain::ToolParameter;

    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echo the text back")
                .with_parameter(ToolParameter::new("text", "Text to echo", true))
        }

        async fn execute(&self, call: &ToolCall) -> ToolResult {
            ToolResult::success("echo", &call.id, call.get_string("text").unwrap_or_default())
        }
    }

    struct Explodes;

    #[async_trait]
    impl Capability for Explodes {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("explode", "Always panics")
        }

        async fn execute(&self, _call: &ToolCall) -> ToolResult {
            panic!("kaboom")
        }
    }

    #[test]
    fn test_terminate_always_registered() {
        let registry = CapabilityRegistry::new();
        assert!(registry.has_tool("terminate"));
        assert_eq!(registry.available_tools(), vec!["terminate".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_by_name() {
        let registry = CapabilityRegistry::new().register(Echo);
        let result = registry
            .execute(&ToolCall::new("echo").with_arg("text", "hi"))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.payload, "hi");
        assert_eq!(registry.available_tools(), vec!["terminate", "echo"]);
    }

    #[tokio::test]
    async fn test_unknown_capability_is_error_result() {
        let registry = CapabilityRegistry::new();
        let result = registry.execute(&ToolCall::new("launch_rockets")).await;
        assert!(result.is_error);
        assert_eq!(result.error().unwrap().code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_rejected_before_execution() {
        let registry = CapabilityRegistry::new().register(Echo);
        let result = registry.execute(&ToolCall::new("echo")).await;
        assert_eq!(result.error().unwrap().code, "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_panicking_capability_becomes_error_result() {
        let registry = CapabilityRegistry::new().register(Explodes);
        let result = registry.execute(&ToolCall::new("explode")).await;
        let error = result.error().unwrap();
        assert_eq!(error.code, "EXECUTION_FAILED");
        assert!(error.message.contains("kaboom"));
    }

    #[test]
    fn test_reregistering_replaces() {
        let registry = CapabilityRegistry::new().register(Echo).register(Echo);
        assert_eq!(registry.len(), 2);
    }
}
