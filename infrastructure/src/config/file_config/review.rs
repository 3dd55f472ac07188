//! Review configuration from TOML (`[review]` section)

use serde::{Deserialize, Serialize};
use stepwise_application::ReviewParams;
use stepwise_domain::{Checklist, ConfigIssue, ConfigIssueCode};

/// Raw review configuration from TOML
///
/// # Example
///
/// ```toml
/// [review]
/// max_iterations = 3
/// checklist = ["correctness", "error handling", "tests"]   # empty = built-in checklist
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReviewConfig {
    pub max_iterations: usize,
    pub checklist: Vec<String>,
}

impl Default for FileReviewConfig {
    fn default() -> Self {
        Self {
            max_iterations: ReviewParams::default().max_iterations,
            checklist: Vec::new(),
        }
    }
}

impl FileReviewConfig {
    pub fn to_params(&self) -> (ReviewParams, Vec<ConfigIssue>) {
        if self.max_iterations > 0 {
            return (
                ReviewParams {
                    max_iterations: self.max_iterations,
                },
                vec![],
            );
        }
        let params = ReviewParams::default();
        let issue = ConfigIssue::warning(
            ConfigIssueCode::ZeroBudget {
                field: "review.max_iterations".to_string(),
            },
            format!(
                "review.max_iterations: 0 is not allowed, using {}",
                params.max_iterations
            ),
        );
        (params, vec![issue])
    }

    pub fn checklist(&self) -> Checklist {
        let names: Vec<&str> = self
            .checklist
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            Checklist::default()
        } else {
            Checklist::from_names(names)
        }
    }
}
