//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod execute_agent;
pub mod review_loop;
pub mod run_plan;
pub mod shared;
pub mod sub_agents;

#[cfg(test)]
pub(crate) mod testing;
