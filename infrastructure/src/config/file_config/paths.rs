//! Filesystem locations from TOML (`[paths]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw path configuration from TOML
///
/// Relative paths resolve against the working directory. Unset files live
/// under `state_dir`.
///
/// ```toml
/// [paths]
/// state_dir = ".stepwise"
/// conversation_log = ".stepwise/conversation.jsonl"
/// feature_ledger = "features.json"
/// progress_log = "progress.txt"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePathsConfig {
    pub state_dir: Option<PathBuf>,
    pub conversation_log: Option<PathBuf>,
    pub feature_ledger: Option<PathBuf>,
    pub progress_log: Option<PathBuf>,
}

impl FilePathsConfig {
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".stepwise"))
    }

    pub fn plans_dir(&self) -> PathBuf {
        self.state_dir().join("plans")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.state_dir().join("checkpoints")
    }

    /// `None` disables the conversation log.
    pub fn conversation_log(&self) -> Option<PathBuf> {
        self.conversation_log.clone()
    }

    pub fn feature_ledger(&self) -> PathBuf {
        self.feature_ledger
            .clone()
            .unwrap_or_else(|| self.state_dir().join("features.json"))
    }

    pub fn progress_log(&self) -> PathBuf {
        self.progress_log
            .clone()
            .unwrap_or_else(|| self.state_dir().join("progress.txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_default_under_state_dir() {
        let paths = FilePathsConfig {
            state_dir: Some(PathBuf::from("/tmp/run")),
            ..Default::default()
        };
        assert_eq!(paths.plans_dir(), PathBuf::from("/tmp/run/plans"));
        assert_eq!(paths.feature_ledger(), PathBuf::from("/tmp/run/features.json"));
        assert!(paths.conversation_log().is_none());
    }
}
