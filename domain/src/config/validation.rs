//! Structured configuration issues.
//!
//! The infrastructure loader reports problems it can recover from (unknown
//! enum values, inverted bounds) as [`ConfigIssue`]s instead of failing, and
//! falls back to defaults.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The configuration cannot work as written.
    Error,
    /// The configuration works but a fallback was applied.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    InvalidBounds {
        field: String,
        min: usize,
        max: usize,
    },
    ZeroBudget {
        field: String,
    },
    UnknownVariant {
        variant: String,
    },
    EmptyRoutingRule {
        index: usize,
    },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", label, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let issue = ConfigIssue::warning(
            ConfigIssueCode::ZeroBudget {
                field: "planning.retry_budget".into(),
            },
            "planning.retry_budget must be at least 1, using 3",
        );
        assert_eq!(
            issue.to_string(),
            "warning: planning.retry_budget must be at least 1, using 3"
        );
        assert!(!issue.is_error());
    }
}
