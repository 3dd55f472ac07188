//! Agent configuration from TOML (`[agent]` section)

use serde::{Deserialize, Serialize};
use stepwise_application::AgentParams;
use stepwise_domain::{ConfigIssue, ConfigIssueCode, EffortLevel};

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// effort = "medium"          # "low", "medium", "high"; raises every step budget
/// max_steps = 10
/// duplicate_threshold = 2
/// checkpoint_interval = 5    # 0 disables checkpoints
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub effort: Option<String>,
    pub max_steps: usize,
    pub duplicate_threshold: usize,
    pub checkpoint_interval: usize,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            effort: None,
            max_steps: 10,
            duplicate_threshold: 2,
            checkpoint_interval: 0,
        }
    }
}

impl FileAgentConfig {
    /// Parse `effort`, dropping it with a warning when unrecognized.
    pub fn parse_effort(&self) -> (Option<EffortLevel>, Vec<ConfigIssue>) {
        let Some(raw) = &self.effort else {
            return (None, vec![]);
        };
        match raw.parse::<EffortLevel>() {
            Ok(level) => (Some(level), vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "agent.effort".to_string(),
                        value: raw.clone(),
                        valid_values: vec![
                            "low".to_string(),
                            "medium".to_string(),
                            "high".to_string(),
                        ],
                    },
                    format!("agent.effort: unknown value '{}', ignoring it", raw),
                );
                (None, vec![issue])
            }
        }
    }

    pub fn to_params(&self) -> (AgentParams, Vec<ConfigIssue>) {
        let (effort, mut issues) = self.parse_effort();
        let defaults = AgentParams::default();

        let max_steps = if self.max_steps == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroBudget {
                    field: "agent.max_steps".to_string(),
                },
                format!("agent.max_steps: 0 is not allowed, using {}", defaults.max_steps),
            ));
            defaults.max_steps
        } else {
            self.max_steps
        };

        let mut params = defaults
            .with_max_steps(max_steps)
            .with_duplicate_threshold(self.duplicate_threshold.max(1))
            .with_checkpoint_interval(self.checkpoint_interval);
        if let Some(effort) = effort {
            params = params.with_effort(effort);
        }
        (params, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_effort() {
        let config = FileAgentConfig {
            effort: Some("HIGH".to_string()),
            ..Default::default()
        };
        assert_eq!(config.parse_effort(), (Some(EffortLevel::High), vec![]));
    }

    #[test]
    fn test_unknown_effort_is_a_warning() {
        let config = FileAgentConfig {
            effort: Some("maximum".to_string()),
            ..Default::default()
        };
        let (effort, issues) = config.parse_effort();
        assert!(effort.is_none());
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_to_params() {
        let config = FileAgentConfig {
            effort: Some("low".to_string()),
            max_steps: 0,
            checkpoint_interval: 4,
            ..Default::default()
        };
        let (params, issues) = config.to_params();
        assert_eq!(issues.len(), 1);
        assert_eq!(params.max_steps, 10);
        assert_eq!(params.effort, Some(EffortLevel::Low));
        assert_eq!(params.checkpoint_interval, Some(4));
    }
}
