//! Capability registry and the built-in orchestration capabilities
//!
//! The [`CapabilityRegistry`] is the only [`ToolExecutorPort`] adapter. It
//! owns a name-indexed table of [`Capability`] implementations and turns
//! every failure mode (unknown name, bad arguments, a panicking capability)
//! into an error-flagged [`ToolResult`].
//!
//! ```ignore
//! let registry = CapabilityRegistry::new()
//!     .register(UpdateFeatureCapability::new(ledger))
//!     .register(AppendProgressCapability::new(progress));
//!
//! assert!(registry.has_tool("terminate"));
//! let result = registry.execute(&ToolCall::new("append_progress").with_arg("text", "done")).await;
//! ```
//!
//! [`ToolExecutorPort`]: stepwise_application::ports::tool_executor::ToolExecutorPort
//! [`Capability`]: stepwise_domain::Capability
//! [`ToolResult`]: stepwise_domain::ToolResult

mod builtin;
mod registry;

pub use builtin::{
    APPEND_PROGRESS, AppendProgressCapability, TerminateCapability, UPDATE_FEATURE,
    UpdateFeatureCapability,
};
pub use registry::CapabilityRegistry;
