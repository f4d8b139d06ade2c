//! Local filesystem object store
//!
//! Keys map to paths below the root directory. Each write goes to a temporary
//! file in the destination directory which is renamed over the final path once
//! complete, so readers never observe a half-written export. The content type
//! is not persisted.

use super::ObjectStore;
use crate::error::StorageError;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Stores objects as files under `root`
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path an object with `key` is written to
    pub fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if key.is_empty() || escapes {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
                reason: "must be a relative path without `.` or `..`".to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

fn write_atomically(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "object path has no parent")
    })?;
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(body)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        tracing::debug!(path = %path.display(), content_type, "writing object");

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &body))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e.to_string())))??;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
