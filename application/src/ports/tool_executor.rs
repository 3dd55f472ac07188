//! Tool Executor port
//!
//! The agent loop sees capabilities only through this port: a list of
//! definitions to advertise and a dispatch method that never fails outright.

use async_trait::async_trait;
use stepwise_domain::{ToolCall, ToolDefinition, ToolResult};

/// Port for capability dispatch
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Definitions of every capability this executor can dispatch.
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn has_tool(&self, name: &str) -> bool {
        self.definitions().iter().any(|d| d.name == name)
    }

    fn available_tools(&self) -> Vec<String> {
        self.definitions().into_iter().map(|d| d.name).collect()
    }

    /// Dispatch a call. Unknown names, invalid arguments and capability
    /// failures all come back as error results.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
