//! JSON snapshot files with atomic replacement
//!
//! A snapshot is written to a sibling temp file, synced, then renamed over the
//! target, so a reader only ever sees the previous or the new snapshot.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub async fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec_pretty(value)?;
    let tmp = temp_path(path);
    if let Err(e) = replace_with(&tmp, path, &json).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    tracing::debug!("Wrote snapshot {} ({} bytes)", path.display(), json.len());
    Ok(())
}

async fn replace_with(tmp: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, path).await
}

/// Read a snapshot. `Ok(None)` when the file does not exist; a file that
/// exists but does not parse is `StorageCorrupt`.
pub async fn read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| Error::corrupt(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("snap.json");

        let mut value = BTreeMap::new();
        value.insert("1".to_string(), "alpha".to_string());
        write_atomic(&path, &value).await.unwrap();

        let loaded: BTreeMap<String, String> = read(&path).await.unwrap().unwrap();
        assert_eq!(loaded, value);
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded: Option<Vec<String>> = read(&dir.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_read_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let result: Result<Option<Vec<String>>> = read(&path).await;
        assert!(matches!(result, Err(Error::StorageCorrupt { .. })));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_previous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");

        write_atomic(&path, &vec!["old"]).await.unwrap();
        write_atomic(&path, &vec!["new", "newer"]).await.unwrap();

        let loaded: Vec<String> = read(&path).await.unwrap().unwrap();
        assert_eq!(loaded, vec!["new", "newer"]);
    }

    #[tokio::test]
    async fn test_failed_replace_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("insights.json");
        // A non-empty directory in the way makes the final rename fail.
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let result = write_atomic(&path, &vec!["a", "b"]).await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!temp_path(&path).exists());
        assert!(path.is_dir());
    }
}
