//! Application-level configuration.
//!
//! [`OrchestrationParams`] groups the loop-control knobs of every use case:
//!
//! - [`AgentParams`]: step budget, effort, stuck detection, checkpoints
//! - [`PlanningParams`]: decomposition bounds, retry budget, failure policy
//! - [`ReviewParams`]: review iteration limit

pub mod orchestration_params;

pub use orchestration_params::{
    AgentParams, OrchestrationParams, PlanningParams, ReviewParams, VerificationMode,
};
