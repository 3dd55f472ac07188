//! Prompt domain
//!
//! Templates for every model call the orchestrators make.

pub mod agent;
pub mod review;

pub use agent::AgentPromptTemplate;
pub use review::ReviewPromptTemplate;
