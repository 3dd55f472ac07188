//! Task descriptors handed to the router

use serde::{Deserialize, Serialize};

/// What the router sees of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_tag: Option<String>,
}

impl TaskDescriptor {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            executor_tag: None,
        }
    }

    pub fn with_executor_tag(mut self, tag: impl Into<String>) -> Self {
        self.executor_tag = Some(tag.into());
        self
    }

    /// Lowercased alphanumeric words of the description.
    pub fn tokens(&self) -> Vec<String> {
        tokenize(&self.description)
    }
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
