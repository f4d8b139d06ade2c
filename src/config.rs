//! Configuration types for search-export

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, path::PathBuf, time::Duration};

/// Environment variable overriding the object store endpoint
pub const ENV_S3_ENDPOINT: &str = "SEARCH_EXPORT_S3_ENDPOINT";
/// Environment variable overriding the object store bucket
pub const ENV_BUCKET: &str = "SEARCH_EXPORT_BUCKET";

/// Main configuration for the export pipeline
///
/// Every section has sensible defaults; only `environments` must be filled in
/// before a job can run, since each job names the environment it queries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search endpoints keyed by environment name (e.g. "prod", "uat", "sit")
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,

    /// Search service request behavior
    #[serde(default)]
    pub search: SearchConfig,

    /// Object store target
    #[serde(default)]
    pub storage: StorageConfig,

    /// Output formatting
    #[serde(default)]
    pub export: ExportConfig,

    /// Queue worker behavior
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Search endpoint of one deployment environment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// GraphQL host, e.g. "https://graphql.example.com"; requests go to `{host}/api`
    pub graphql_host: String,

    /// Value for the `Authorization` header on search requests
    #[serde(default)]
    pub auth_header: Option<String>,
}

/// Search request configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Timeout for a single page request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Maximum number of pages fetched for one job (default: 10000)
    ///
    /// Guards against a service that keeps returning non-empty pages.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Fail when a non-empty page returns a cursor that was already sent (default: true)
    ///
    /// Turn off for scroll-style services that reuse one cursor for every page.
    #[serde(default = "default_true")]
    pub reject_repeated_cursors: bool,

    /// User agent sent with search requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            max_pages: default_max_pages(),
            reject_repeated_cursors: true,
            user_agent: default_user_agent(),
        }
    }
}

/// Object store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which store receives finished exports
    #[serde(default)]
    pub backend: StorageBackend,

    /// Timeout for the single publish write (default: 60 seconds)
    #[serde(default = "default_publish_timeout", with = "duration_serde")]
    pub publish_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            publish_timeout: default_publish_timeout(),
        }
    }
}

/// Object store backend selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageBackend {
    /// Path-style HTTP store, `{endpoint}/{bucket}/{key}`, for unauthenticated or
    /// proxy-fronted S3-compatible endpoints (requests are not SigV4 signed)
    Http {
        /// Store endpoint, e.g. "http://localhost:5000"
        endpoint: String,
        /// Bucket name
        bucket: String,
        /// Value for the `Authorization` header on writes
        #[serde(default)]
        auth_header: Option<String>,
    },
    /// Local directory; keys map to relative paths below `root`
    Filesystem {
        /// Root directory for exports
        root: PathBuf,
    },
    /// Process-local store, useful when embedding or testing
    Memory,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Filesystem {
            root: PathBuf::from("./exports"),
        }
    }
}

/// Output formatting configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Separator used when a CSV cell collects several values (default: ",")
    #[serde(default = "default_list_separator")]
    pub list_separator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            list_separator: default_list_separator(),
        }
    }
}

/// Queue worker configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum number of jobs from one queue batch run at the same time (default: 4)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Deadline for a whole job, fetch through publish (None = no deadline)
    #[serde(default, with = "optional_duration_serde")]
    pub job_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            job_timeout: None,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("failed to parse configuration: {}", e),
            key: None,
        })
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Apply `SEARCH_EXPORT_S3_ENDPOINT` / `SEARCH_EXPORT_BUCKET` overrides
    ///
    /// When both are set the storage backend becomes an HTTP store. Setting only
    /// the bucket re-targets an already configured HTTP store.
    pub fn with_env_overrides(mut self) -> Self {
        let endpoint = std::env::var(ENV_S3_ENDPOINT).ok().filter(|v| !v.is_empty());
        let bucket = std::env::var(ENV_BUCKET).ok().filter(|v| !v.is_empty());

        match (&mut self.storage.backend, endpoint, bucket) {
            (StorageBackend::Http { endpoint: e, bucket: b, .. }, new_endpoint, new_bucket) => {
                if let Some(new_endpoint) = new_endpoint {
                    *e = new_endpoint;
                }
                if let Some(new_bucket) = new_bucket {
                    *b = new_bucket;
                }
            }
            (backend, Some(endpoint), Some(bucket)) => {
                *backend = StorageBackend::Http {
                    endpoint,
                    bucket,
                    auth_header: None,
                };
            }
            (_, Some(_), None) | (_, None, Some(_)) => {
                tracing::warn!(
                    "{} and {} must both be set to switch to the HTTP store, ignoring",
                    ENV_S3_ENDPOINT,
                    ENV_BUCKET
                );
            }
            (_, None, None) => {}
        }

        self
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        for (name, env) in &self.environments {
            url::Url::parse(&env.graphql_host).map_err(|e| Error::Config {
                message: format!("graphql_host of environment {} is not a URL: {}", name, e),
                key: Some(format!("environments.{}.graphql_host", name)),
            })?;
        }

        if self.search.max_pages == 0 {
            return Err(Error::Config {
                message: "max_pages must be at least 1".to_string(),
                key: Some("search.max_pages".to_string()),
            });
        }

        if self.worker.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".to_string(),
                key: Some("worker.max_concurrent_jobs".to_string()),
            });
        }

        if let StorageBackend::Http {
            endpoint, bucket, ..
        } = &self.storage.backend
        {
            url::Url::parse(endpoint).map_err(|e| Error::Config {
                message: format!("storage endpoint is not a URL: {}", e),
                key: Some("storage.backend.endpoint".to_string()),
            })?;
            if bucket.is_empty() {
                return Err(Error::Config {
                    message: "bucket must not be empty".to_string(),
                    key: Some("storage.backend.bucket".to_string()),
                });
            }
        }

        Ok(())
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_pages() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("search-export/{}", env!("CARGO_PKG_VERSION"))
}

fn default_publish_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_list_separator() -> String {
    ",".to_string()
}

fn default_max_concurrent_jobs() -> usize {
    4
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: env tests are serialized with #[serial]
        unsafe {
            std::env::remove_var(ENV_S3_ENDPOINT);
            std::env::remove_var(ENV_BUCKET);
        }
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config = Config::from_json_str("{}").unwrap();

        assert!(config.environments.is_empty());
        assert_eq!(config.search.request_timeout, Duration::from_secs(30));
        assert_eq!(config.search.max_pages, 10_000);
        assert!(config.search.reject_repeated_cursors);
        assert_eq!(config.storage.publish_timeout, Duration::from_secs(60));
        assert_eq!(config.export.list_separator, ",");
        assert_eq!(config.worker.max_concurrent_jobs, 4);
        assert_eq!(config.worker.job_timeout, None);
        assert!(matches!(
            config.storage.backend,
            StorageBackend::Filesystem { .. }
        ));
    }

    #[test]
    fn parses_full_configuration() {
        let json = r#"{
            "environments": {
                "prod": { "graphql_host": "https://graphql.example.com", "auth_header": "Bearer abc" }
            },
            "search": { "request_timeout": 5, "max_pages": 50, "reject_repeated_cursors": false },
            "storage": {
                "backend": { "type": "http", "endpoint": "http://localhost:5000", "bucket": "exports" },
                "publish_timeout": 10
            },
            "export": { "list_separator": "; " },
            "worker": { "max_concurrent_jobs": 2, "job_timeout": 900 }
        }"#;

        let config = Config::from_json_str(json).unwrap();
        config.validate().unwrap();

        let prod = &config.environments["prod"];
        assert_eq!(prod.graphql_host, "https://graphql.example.com");
        assert_eq!(prod.auth_header.as_deref(), Some("Bearer abc"));
        assert_eq!(config.search.request_timeout, Duration::from_secs(5));
        assert_eq!(config.search.max_pages, 50);
        assert!(!config.search.reject_repeated_cursors);
        assert_eq!(
            config.storage.backend,
            StorageBackend::Http {
                endpoint: "http://localhost:5000".into(),
                bucket: "exports".into(),
                auth_header: None,
            }
        );
        assert_eq!(config.export.list_separator, "; ");
        assert_eq!(config.worker.job_timeout, Some(Duration::from_secs(900)));
    }

    #[test]
    fn validate_rejects_bad_graphql_host() {
        let mut config = Config::default();
        config.environments.insert(
            "dev".into(),
            EnvironmentConfig {
                graphql_host: "not a url".into(),
                auth_header: None,
            },
        );

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("environments.dev.graphql_host"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.search.max_pages = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.worker.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_duration_is_a_parse_error() {
        let result = Config::from_json_str(r#"{"search": {"request_timeout": -1}}"#);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"search": {"max_pages": 7}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.search.max_pages, 7);
    }

    #[test]
    #[serial]
    fn env_overrides_switch_to_http_store() {
        clear_env();
        // SAFETY: env tests are serialized with #[serial]
        unsafe {
            std::env::set_var(ENV_S3_ENDPOINT, "http://0.0.0.0:5000");
            std::env::set_var(ENV_BUCKET, "search-exports");
        }

        let config = Config::default().with_env_overrides();
        clear_env();

        assert_eq!(
            config.storage.backend,
            StorageBackend::Http {
                endpoint: "http://0.0.0.0:5000".into(),
                bucket: "search-exports".into(),
                auth_header: None,
            }
        );
    }

    #[test]
    #[serial]
    fn bucket_override_retargets_existing_http_store() {
        clear_env();
        // SAFETY: env tests are serialized with #[serial]
        unsafe {
            std::env::set_var(ENV_BUCKET, "other-bucket");
        }

        let mut config = Config::default();
        config.storage.backend = StorageBackend::Http {
            endpoint: "http://store".into(),
            bucket: "exports".into(),
            auth_header: Some("token".into()),
        };
        let config = config.with_env_overrides();
        clear_env();

        assert_eq!(
            config.storage.backend,
            StorageBackend::Http {
                endpoint: "http://store".into(),
                bucket: "other-bucket".into(),
                auth_header: Some("token".into()),
            }
        );
    }

    #[test]
    #[serial]
    fn lone_endpoint_override_is_ignored_for_filesystem_store() {
        clear_env();
        // SAFETY: env tests are serialized with #[serial]
        unsafe {
            std::env::set_var(ENV_S3_ENDPOINT, "http://0.0.0.0:5000");
        }

        let config = Config::default().with_env_overrides();
        clear_env();

        assert_eq!(config.storage.backend, StorageBackend::default());
    }
}
