//! Executing-agent domain
//!
//! The lifecycle is an explicit finite-state value:
//!
//! ```text
//! Idle ──start──▶ Running ──finish──▶ Finished
//!                    │
//!                    └────fail────▶ Error
//! ```
//!
//! [`AgentRunState`](run_state::AgentRunState) carries the lifecycle together
//! with the step counter and transcript, so every transition can be tested
//! without constructing a full agent.

pub mod effort;
pub mod lifecycle;
pub mod run_state;
pub mod stuck;
pub mod summary;

pub use effort::EffortLevel;
pub use lifecycle::{AgentLifecycle, LifecycleEvent};
pub use run_state::{AgentRunState, Termination};
pub use stuck::StuckDetector;
pub use summary::RunSummary;
