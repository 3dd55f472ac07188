//! The capability contract consumed by the agent loop.

use super::entities::{ToolCall, ToolDefinition};
use super::value_objects::ToolResult;
use async_trait::async_trait;

/// An executable unit registered under a unique name.
///
/// Implementations must report failures through
/// [`ToolResult::failure`] rather than panicking, so one broken capability
/// never takes the agent down with it.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Name, description and argument schema.
    fn definition(&self) -> ToolDefinition;

    /// Execute a call whose arguments already passed schema validation.
    async fn execute(&self, call: &ToolCall) -> ToolResult;

    fn name(&self) -> String {
        self.definition().name
    }
}
