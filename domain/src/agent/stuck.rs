//! Detection of an agent repeating itself

use crate::session::entities::{Message, Role};

/// Hint injected when the agent keeps producing the same answer.
pub const STUCK_HINT: &str = "Observed duplicate responses. Consider new strategies and avoid \
repeating ineffective paths already attempted.";

/// Flags a run whose latest assistant output repeats earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StuckDetector {
    /// Number of earlier identical assistant messages that counts as stuck.
    pub threshold: usize,
}

impl Default for StuckDetector {
    fn default() -> Self {
        Self { threshold: 2 }
    }
}

impl StuckDetector {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn is_stuck(&self, transcript: &[Message]) -> bool {
        if self.threshold == 0 {
            return false;
        }
        let mut assistant = transcript.iter().rev().filter(|m| m.role == Role::Assistant);
        let Some(last) = assistant.next() else {
            return false;
        };
        if last.content.trim().is_empty() {
            return false;
        }
        let repeats = assistant.filter(|m| m.content == last.content).count();
        repeats >= self.threshold
    }
}
