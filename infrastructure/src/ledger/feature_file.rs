//! JSON feature ledger on disk

use crate::storage::write_atomic;
use std::path::{Path, PathBuf};
use stepwise_domain::{FeatureEntry, FeatureLedger, LedgerError};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

/// Errors reading or updating the ledger file
#[derive(Error, Debug)]
pub enum LedgerFileError {
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Ledger update rejected: {0}")]
    Rejected(#[from] LedgerError),

    #[error("No feature matches '{0}'")]
    UnknownFeature(String),
}

/// Feature ledger stored as a JSON array.
///
/// A missing file reads as an empty ledger.
pub struct FileFeatureLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileFeatureLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<FeatureLedger, LedgerFileError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FeatureLedger::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, ledger: &FeatureLedger) -> Result<(), LedgerFileError> {
        let json = serde_json::to_vec_pretty(ledger)?;
        write_atomic(&self.path, &json).await?;
        Ok(())
    }

    /// Flip `passes` on the feature with this exact description.
    pub async fn set_passes(
        &self,
        description: &str,
        passes: bool,
    ) -> Result<FeatureLedger, LedgerFileError> {
        let _guard = self.write_lock.lock().await;
        let mut ledger = self.load().await?;
        let index = ledger
            .find(description)
            .ok_or_else(|| LedgerFileError::UnknownFeature(description.to_string()))?;
        ledger.set_passes(index, passes)?;
        self.store(&ledger).await?;
        info!(feature = %description, passes, "Feature ledger updated");
        Ok(ledger)
    }

    pub async fn append(&self, entry: FeatureEntry) -> Result<FeatureLedger, LedgerFileError> {
        let _guard = self.write_lock.lock().await;
        let mut ledger = self.load().await?;
        ledger.append(entry);
        self.store(&ledger).await?;
        Ok(ledger)
    }

    /// Replace the whole ledger, provided no entry was removed, reordered
    /// or edited beyond `passes`.
    pub async fn replace(&self, proposed: FeatureLedger) -> Result<(), LedgerFileError> {
        let _guard = self.write_lock.lock().await;
        let current = self.load().await?;
        current.check_update(&proposed)?;
        self.store(&proposed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seeded(dir: &Path) -> FileFeatureLedger {
        let ledger = FeatureLedger::new(vec![
            FeatureEntry::new("functional", "login works").with_step("open /login"),
            FeatureEntry::new("functional", "logout works"),
        ]);
        let path = dir.join("features.json");
        std::fs::write(&path, serde_json::to_string(&ledger).unwrap()).unwrap();
        FileFeatureLedger::new(path)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileFeatureLedger::new(dir.path().join("none.json"));
        assert!(ledger.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_passes_persists() {
        let dir = tempfile::tempdir().unwrap();
        let file = seeded(dir.path());
        file.set_passes("logout works", true).await.unwrap();

        let reloaded = file.load().await.unwrap();
        assert!(!reloaded.entries()[0].passes);
        assert!(reloaded.entries()[1].passes);
    }

    #[tokio::test]
    async fn test_unknown_feature() {
        let dir = tempfile::tempdir().unwrap();
        let file = seeded(dir.path());
        assert!(matches!(
            file.set_passes("signup works", true).await,
            Err(LedgerFileError::UnknownFeature(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_rejects_edits_to_frozen_fields() {
        let dir = tempfile::tempdir().unwrap();
        let file = seeded(dir.path());
        let mut entries = file.load().await.unwrap().entries().to_vec();
        entries[0].description = "login sort of works".into();

        let err = file.replace(FeatureLedger::new(entries)).await.unwrap_err();
        assert!(matches!(err, LedgerFileError::Rejected(LedgerError::FrozenFieldChanged { index: 0, .. })));
        assert_eq!(file.load().await.unwrap().entries()[0].description, "login works");
    }

    #[tokio::test]
    async fn test_concurrent_flips_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let file = Arc::new(seeded(dir.path()));
        let a = tokio::spawn({
            let file = file.clone();
            async move { file.set_passes("login works", true).await }
        });
        let b = tokio::spawn({
            let file = file.clone();
            async move { file.set_passes("logout works", true).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(file.load().await.unwrap().passing(), 2);
    }
}
