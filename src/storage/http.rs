//! HTTP object store with S3 path-style addressing
//!
//! Requests carry at most a fixed `Authorization` header and are not SigV4
//! signed. Point it at an unauthenticated S3-compatible endpoint (a local mock
//! or a private deployment) or at a proxy that signs on the caller's behalf.

use super::ObjectStore;
use crate::error::{Error, Result, StorageError};
use async_trait::async_trait;
use url::Url;

/// Writes objects with `PUT {endpoint}/{bucket}/{key}`
pub struct HttpObjectStore {
    http_client: reqwest::Client,
    base: Url,
    auth_header: Option<String>,
}

impl HttpObjectStore {
    /// Create a store for `bucket` at `endpoint`
    ///
    /// # Errors
    /// Returns error if the endpoint is not a URL or the HTTP client cannot be created
    pub fn new(endpoint: &str, bucket: &str, auth_header: Option<String>) -> Result<Self> {
        let mut base = Url::parse(endpoint).map_err(|e| Error::Config {
            message: format!("storage endpoint is not a URL: {}", e),
            key: Some("storage.backend.endpoint".to_string()),
        })?;

        base.path_segments_mut()
            .map_err(|_| Error::Config {
                message: format!("storage endpoint cannot be a base URL: {}", endpoint),
                key: Some("storage.backend.endpoint".to_string()),
            })?
            .pop_if_empty()
            .push(bucket);

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self {
            http_client,
            base,
            auth_header,
        })
    }

    /// URL an object with `key` is written to
    pub fn object_url(&self, key: &str) -> std::result::Result<Url, StorageError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidKey {
                key: key.to_string(),
                reason: "endpoint cannot hold a path".to_string(),
            })?
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> std::result::Result<(), StorageError> {
        let url = self.object_url(key)?;

        let mut request = self
            .http_client
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);

        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), "object store rejected write");
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url = %url, "object written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
