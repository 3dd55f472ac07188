//! Capability (tool) domain module
//!
//! The orchestration core treats every external action as a *capability*:
//! a named unit with a declared argument schema and an
//! `execute(call) -> ToolResult` contract. Concrete capabilities live in the
//! infrastructure layer and are looked up by name.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolDefinition │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (schema)       │    │ (invocation) │    │ (payload)    │
//! └────────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! A small set of names is reserved by the agent loop itself, see
//! [`reserved`]. Invoking [`reserved::TERMINATE`] finishes the agent
//! regardless of the capability's own result.
//!
//! Failures never escape as panics or errors: a capability that cannot do its
//! work returns a [`ToolResult`] with `is_error = true`, which the agent feeds
//! back into its transcript.

pub mod capability;
pub mod entities;
pub mod reserved;
pub mod traits;
pub mod value_objects;

pub use capability::Capability;
pub use entities::{ToolCall, ToolDefinition, ToolParameter};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolResult};
