//! File-backed stores for plans and agent checkpoints

mod checkpoint;
mod plan_store;

pub use checkpoint::{CheckpointError, CheckpointInfo, FileCheckpointStore};
pub use plan_store::JsonFilePlanStore;

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `bytes` to a uniquely named temp file next to `path`, then persist
/// it over `path`.
///
/// Readers see either the old or the new content, never a partial write.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| err.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_replaces_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.json");

        write_atomic(&path, b"one").await.unwrap();
        write_atomic(&path, b"two").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_publish_partial_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        let big_a = vec![b'a'; 256 * 1024];
        let big_b = vec![b'b'; 256 * 1024];

        let mut handles = Vec::new();
        for i in 0..8 {
            let path = path.clone();
            let bytes = if i % 2 == 0 { big_a.clone() } else { big_b.clone() };
            handles.push(tokio::spawn(async move { write_atomic(&path, &bytes).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let content = std::fs::read(&path).unwrap();
        assert_eq!(content.len(), 256 * 1024);
        assert!(content.iter().all(|b| *b == content[0]));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
