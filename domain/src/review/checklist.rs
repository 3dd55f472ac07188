//! Evaluation checklists handed to the reviewer

use serde::{Deserialize, Serialize};

/// One named evaluation criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub description: String,
}

impl Criterion {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Small ordered set of criteria every review must address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    criteria: Vec<Criterion>,
}

impl Default for Checklist {
    fn default() -> Self {
        Self {
            criteria: vec![
                Criterion::new(
                    "Logic & Correctness",
                    "Does it do what was asked? Are edge cases handled?",
                ),
                Criterion::new(
                    "Error Handling",
                    "Are failures reported instead of silently ignored?",
                ),
                Criterion::new(
                    "Code Quality",
                    "Is it readable, well named and free of needless complexity?",
                ),
                Criterion::new(
                    "Security",
                    "Are inputs validated and secrets kept out of the output?",
                ),
                Criterion::new("Testing", "Is the behavior covered by meaningful tests?"),
            ],
        }
    }
}

impl Checklist {
    pub fn new(criteria: Vec<Criterion>) -> Self {
        Self { criteria }
    }

    /// Build from bare names, each used as its own description.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .map(|n| {
                    let name = n.into();
                    Criterion::new(name.clone(), name)
                })
                .collect(),
        )
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Numbered list for prompts.
    pub fn render(&self) -> String {
        self.criteria
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. **{}**: {}", i + 1, c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
