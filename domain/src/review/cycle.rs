//! Record of one Doer-Critic round

use super::grade::Grade;
use serde::{Deserialize, Serialize};

/// One produce → critique round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCycle {
    /// Zero-based; always below the configured maximum.
    pub iteration: usize,
    pub artifact: String,
    /// Grade as parsed from the reviewer, before the `Unknown` fallback.
    pub grade: Grade,
    pub feedback: String,
}

impl ReviewCycle {
    pub fn passed(&self) -> bool {
        self.grade.effective() == Grade::Pass
    }
}
