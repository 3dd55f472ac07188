//! Compact summary of a finished agent run

use super::lifecycle::AgentLifecycle;
use super::run_state::{AgentRunState, Termination};
use crate::core::string::preview;
use serde::{Deserialize, Serialize};

/// Maximum characters of the final answer kept in a summary.
pub const FINAL_PREVIEW_CHARS: usize = 500;

/// What a parent learns about a finished run, without its transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps: usize,
    pub max_steps: usize,
    pub messages: usize,
    pub tool_calls: usize,
    pub lifecycle: AgentLifecycle,
    pub termination: Option<Termination>,
    pub truncated: bool,
    pub final_preview: String,
}

impl RunSummary {
    pub fn from_state(state: &AgentRunState) -> Self {
        Self {
            steps: state.step(),
            max_steps: state.max_steps(),
            messages: state.transcript().len(),
            tool_calls: state.tool_call_count(),
            lifecycle: state.lifecycle(),
            termination: state.termination(),
            truncated: state.is_truncated(),
            final_preview: preview(state.final_text().unwrap_or_default(), FINAL_PREVIEW_CHARS),
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} after {}/{} steps ({} messages, {} tool calls)",
            self.lifecycle, self.steps, self.max_steps, self.messages, self.tool_calls
        )?;
        if let Some(termination) = self.termination {
            write!(f, " [{}]", termination)?;
        }
        if self.truncated {
            write!(f, " [truncated]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::entities::Message;

    #[test]
    fn test_summary_of_truncated_run() {
        let mut state = AgentRunState::new(1, vec![Message::user("task")]);
        state.start().unwrap();
        state.begin_step().unwrap();
        state.push(Message::assistant("partial"));
        state.finish(Termination::StepBudgetExhausted).unwrap();

        let summary = RunSummary::from_state(&state);
        assert_eq!(summary.steps, 1);
        assert_eq!(summary.messages, 2);
        assert!(summary.truncated);
        assert_eq!(summary.final_preview, "partial");
        assert_eq!(
            summary.to_string(),
            "finished after 1/1 steps (2 messages, 0 tool calls) [step_budget_exhausted] [truncated]"
        );
    }

    #[test]
    fn test_preview_is_bounded() {
        let mut state = AgentRunState::new(1, Vec::new());
        state.start().unwrap();
        state.push(Message::assistant("x".repeat(2000)));
        state.finish(Termination::FinalAnswer).unwrap();
        assert_eq!(RunSummary::from_state(&state).final_preview.chars().count(), FINAL_PREVIEW_CHARS);
    }
}
