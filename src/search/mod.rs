//! Search service access
//!
//! - [`SearchClient`] is the seam to the GraphQL service: one request in, the
//!   response `data` out.
//! - [`GraphQlClient`] implements it over HTTP.
//! - [`fetcher`] drives cursor pagination on top of any client.

pub mod fetcher;

pub use fetcher::{FetchSummary, PaginatedFetcher};

use crate::config::{EnvironmentConfig, SearchConfig};
use crate::error::{Error, FetchError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Trait for issuing one search request
///
/// Implementations return the `data` member of the GraphQL response (or `Null`
/// when the service sent none). Transport problems, non-success statuses and a
/// non-empty `errors` member are reported as [`FetchError`].
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run `query` with `variables` and return the response data
    async fn execute(
        &self,
        query: &Value,
        variables: &Map<String, Value>,
    ) -> std::result::Result<Value, FetchError>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a Value,
    variables: &'a Map<String, Value>,
}

/// GraphQL over HTTP: `POST {graphql_host}/api`
pub struct GraphQlClient {
    http_client: reqwest::Client,
    endpoint: String,
    auth_header: Option<String>,
    timeout: Duration,
}

impl GraphQlClient {
    /// Create a client for one environment
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(environment: &EnvironmentConfig, search: &SearchConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(search.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/api", environment.graphql_host.trim_end_matches('/')),
            auth_header: environment.auth_header.clone(),
            timeout: search.request_timeout,
        })
    }

    /// Full request URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            e.into()
        }
    }
}

#[async_trait]
impl SearchClient for GraphQlClient {
    async fn execute(
        &self,
        query: &Value,
        variables: &Map<String, Value>,
    ) -> std::result::Result<Value, FetchError> {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&GraphQlRequest { query, variables });

        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        // One deadline covers the headers and whichever body is read afterwards
        let deadline = tokio::time::Instant::now() + self.timeout;

        let response = match tokio::time::timeout_at(deadline, request.send()).await {
            Ok(result) => result.map_err(|e| self.transport_error(e))?,
            Err(_) => return Err(FetchError::Timeout(self.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = match tokio::time::timeout_at(deadline, response.text()).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "could not read error body");
                    String::new()
                }
                Err(_) => {
                    tracing::debug!(status = status.as_u16(), "error body stalled, dropping it");
                    String::new()
                }
            };
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = match tokio::time::timeout_at(deadline, response.bytes()).await {
            Ok(result) => result.map_err(|e| self.transport_error(e))?,
            Err(_) => return Err(FetchError::Timeout(self.timeout)),
        };

        let envelope: Value = serde_json::from_slice(&body)
            .map_err(|e| FetchError::InvalidResponse(format!("body is not JSON: {}", e)))?;

        into_data(envelope)
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}

/// Split a GraphQL response envelope into its data, surfacing `errors`
fn into_data(envelope: Value) -> std::result::Result<Value, FetchError> {
    let Value::Object(mut envelope) = envelope else {
        return Err(FetchError::InvalidResponse(
            "response is not a JSON object".to_string(),
        ));
    };

    if let Some(Value::Array(errors)) = envelope.get("errors") {
        if !errors.is_empty() {
            let messages = errors
                .iter()
                .map(|e| match e.get("message").and_then(Value::as_str) {
                    Some(message) => message.to_string(),
                    None => e.to_string(),
                })
                .collect();
            return Err(FetchError::GraphQl(messages));
        }
    }

    Ok(envelope.remove("data").unwrap_or(Value::Null))
}
