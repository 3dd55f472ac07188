//! Timestamped progress log entries

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One append-only progress note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl ProgressEntry {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
        }
    }

    /// `[<rfc3339>] <text>` with newlines folded so one entry is one line.
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.text.replace(['\r', '\n'], " ")
        )
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (stamp, text) = rest.split_once("] ")?;
        let timestamp = DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc);
        Some(Self {
            timestamp,
            text: text.to_string(),
        })
    }
}
