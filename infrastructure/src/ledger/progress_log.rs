//! Append-only progress notes

use std::path::{Path, PathBuf};
use stepwise_domain::ProgressEntry;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Text file of `[timestamp] note` lines, opened in append mode on every
/// write and never rewritten.
pub struct ProgressLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, text: &str) -> std::io::Result<ProgressEntry> {
        let entry = ProgressEntry::now(text);
        let line = format!("{}\n", entry.to_line());

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(entry)
    }

    /// Every parsable entry; unparsable lines are skipped.
    pub async fn entries(&self) -> std::io::Result<Vec<ProgressEntry>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text.lines().filter_map(ProgressEntry::parse_line).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
