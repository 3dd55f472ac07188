//! Orchestration progress port.
//!
//! [`OrchestrationProgress`] is an output port the CLI implements to show
//! live progress. Every callback has a no-op default, so implementers only
//! override what they display.

use stepwise_domain::{Plan, ReviewCycle, RunSummary, Step};

/// Progress callbacks for agents, plans and review loops.
pub trait OrchestrationProgress: Send + Sync {
    // ==================== Agent Callbacks ====================

    /// Called at the start of each think/act cycle
    fn on_agent_step(&self, _agent: &str, _step: usize, _max_steps: usize) {}

    fn on_tool_call(&self, _agent: &str, _tool_name: &str) {}

    fn on_tool_result(&self, _agent: &str, _tool_name: &str, _success: bool) {}

    fn on_agent_finished(&self, _agent: &str, _summary: &RunSummary) {}

    // ==================== Plan Callbacks ====================

    fn on_plan_created(&self, _plan: &Plan) {}

    fn on_step_start(&self, _step: &Step, _attempt: usize) {}

    /// Called after each verification of a step result
    fn on_step_verified(&self, _step: &Step, _passed: bool, _feedback: &str) {}

    fn on_step_finished(&self, _step: &Step) {}

    fn on_branch_finished(&self, _branch: &str, _success: bool) {}

    // ==================== Review Callbacks ====================

    fn on_review_cycle(&self, _cycle: &ReviewCycle) {}
}

/// No-op implementation for when progress isn't needed
pub struct NoProgress;

impl OrchestrationProgress for NoProgress {}
