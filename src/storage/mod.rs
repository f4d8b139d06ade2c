//! Object storage for finished exports
//!
//! [`ObjectStore`] is a single-call "put bytes at key with content type"
//! interface. A put either stores the whole object or nothing: the HTTP store
//! sends the complete body in one request, and the filesystem store renames a
//! finished temporary file into place.

mod fs;
mod http;
mod memory;

pub use fs::FsObjectStore;
pub use http::HttpObjectStore;
pub use memory::{MemoryObjectStore, StoredObject};

use crate::config::{StorageBackend, StorageConfig};
use crate::encoding::EncodedExport;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for object store backends
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` at `key` with `content_type`, replacing any existing object
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails. A failed put leaves no
    /// partial object at `key`.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str)
    -> std::result::Result<(), StorageError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Build the store selected in the configuration
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match &config.backend {
        StorageBackend::Http {
            endpoint,
            bucket,
            auth_header,
        } => Arc::new(HttpObjectStore::new(
            endpoint,
            bucket,
            auth_header.clone(),
        )?),
        StorageBackend::Filesystem { root } => Arc::new(FsObjectStore::new(root.clone())),
        StorageBackend::Memory => Arc::new(MemoryObjectStore::new()),
    };

    Ok(store)
}

/// Writes encoded exports to an [`ObjectStore`]
#[derive(Clone)]
pub struct ResultPublisher {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ResultPublisher {
    /// Create a publisher whose writes must finish within `timeout`
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Write `export` to `key` with its format's content type
    ///
    /// Returns the number of bytes stored.
    pub async fn publish(
        &self,
        export: EncodedExport,
        key: &str,
    ) -> std::result::Result<usize, StorageError> {
        let started = std::time::Instant::now();
        let content_type = export.content_type();
        let bytes = export.body.len();
        let put = self.store.put(key, export.body, content_type);

        match tokio::time::timeout(self.timeout, put).await {
            Ok(Ok(())) => {
                tracing::info!(
                    store = self.store.name(),
                    key,
                    content_type,
                    bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "export published"
                );
                Ok(bytes)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(StorageError::Timeout(self.timeout)),
        }
    }
}
