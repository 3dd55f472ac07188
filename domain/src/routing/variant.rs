//! Specialized agent variants

use crate::tool::reserved::is_reserved;
use serde::{Deserialize, Serialize};

/// A specialized agent configuration selected by routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentVariant {
    pub name: String,
    pub system_prompt: String,
    pub max_steps: usize,
    /// Capability names this variant may use. `None` means all of them.
    /// Reserved capabilities are always allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
}

impl AgentVariant {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            max_steps: 10,
            capabilities: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn allows(&self, capability: &str) -> bool {
        is_reserved(capability)
            || self
                .capabilities
                .as_ref()
                .is_none_or(|names| names.iter().any(|n| n == capability))
    }
}

/// The built-in coding, test and build variants.
pub fn standard_variants() -> Vec<AgentVariant> {
    vec![
        AgentVariant::new(
            "coding",
            "You are a careful software engineer. Make the smallest change that \
             accomplishes the task, then call `terminate` with a short report.",
        )
        .with_max_steps(20),
        AgentVariant::new(
            "test",
            "You write and run tests. Prefer one focused failing test that \
             demonstrates the behavior, then call `terminate` with the outcome.",
        )
        .with_max_steps(12),
        AgentVariant::new(
            "build",
            "You run builds and fix build breakage. Report the exact failing \
             command and its output, then call `terminate`.",
        )
        .with_max_steps(8),
    ]
}
