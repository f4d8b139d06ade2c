//! Test configuration helpers for pipelines backed by mock servers

use search_export::config::{EnvironmentConfig, StorageConfig};
use search_export::{Config, ExportPipeline, StorageBackend};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bucket used by the mock object store
pub const TEST_BUCKET: &str = "S3_TEST_BUCKET_NAME";

/// Create a config whose `dev` environment points at `graphql_uri`
pub fn test_config(graphql_uri: &str, backend: StorageBackend) -> Config {
    let mut config = Config::default();
    config.environments.insert(
        "dev".to_string(),
        EnvironmentConfig {
            graphql_host: graphql_uri.to_string(),
            auth_header: None,
        },
    );
    config.search.request_timeout = Duration::from_secs(5);
    config.storage = StorageConfig {
        backend,
        publish_timeout: Duration::from_secs(5),
    };
    config
}

/// Object store backend pointing at a mock S3 server
pub fn http_backend(s3_uri: &str) -> StorageBackend {
    StorageBackend::Http {
        endpoint: s3_uri.to_string(),
        bucket: TEST_BUCKET.to_string(),
        auth_header: None,
    }
}

/// Build a pipeline from `config`
pub fn create_pipeline(config: Config) -> ExportPipeline {
    ExportPipeline::new(config).expect("pipeline config should be valid")
}

/// Serve `first` for the initial request and `next` once the cursor is sent
pub async fn mount_two_pages(server: &MockServer, cursor: &str, first: Value, next: Value) {
    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_partial_json(
            serde_json::json!({ "variables": { "cursor": cursor } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(next))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .up_to_n_times(1)
        .mount(server)
        .await;
}
