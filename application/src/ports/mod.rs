//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod agent_progress;
pub mod checkpoint;
pub mod conversation_logger;
pub mod llm_gateway;
pub mod plan_store;
pub mod tool_executor;
