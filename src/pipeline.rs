//! Export pipeline orchestration
//!
//! One run takes one job message through
//! `Received → Validated → Fetching → Encoding → Publishing → Succeeded`, or to
//! `Failed` from any state with the error that stopped it. Nothing is retried
//! here; a failed run is redelivered whole by the queue, and a rerun writes the
//! same bytes to the same key.

use crate::config::Config;
use crate::encoding::encode;
use crate::error::{EncodingError, Error, IsRetryable, Result, ValidationError};
use crate::job::parse_job_message;
use crate::search::{GraphQlClient, PaginatedFetcher, SearchClient};
use crate::storage::{self, ObjectStore, ResultPublisher};
use crate::types::{ExportEvent, ExportOutcome, JobMessage, JobState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Runs export jobs (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ExportPipeline {
    config: Arc<Config>,
    clients: Arc<HashMap<String, Arc<dyn SearchClient>>>,
    publisher: ResultPublisher,
    event_tx: broadcast::Sender<ExportEvent>,
}

impl ExportPipeline {
    /// Build a pipeline from configuration
    ///
    /// Creates one GraphQL client per configured environment and the configured
    /// object store.
    ///
    /// # Errors
    /// Returns a configuration error if validation fails or a client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let mut clients: HashMap<String, Arc<dyn SearchClient>> = HashMap::new();
        for (name, environment) in &config.environments {
            clients.insert(
                name.clone(),
                Arc::new(GraphQlClient::new(environment, &config.search)?),
            );
        }

        let store = storage::from_config(&config.storage)?;
        Ok(Self::with_parts(config, clients, store))
    }

    /// Build a pipeline from ready-made search clients and store
    pub fn with_parts(
        config: Config,
        clients: HashMap<String, Arc<dyn SearchClient>>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let publisher = ResultPublisher::new(store, config.storage.publish_timeout);

        Self {
            config: Arc::new(config),
            clients: Arc::new(clients),
            publisher,
            event_tx,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to lifecycle events of every run
    pub fn subscribe(&self) -> broadcast::Receiver<ExportEvent> {
        self.event_tx.subscribe()
    }

    /// Run one queue payload to completion
    pub async fn run(&self, body: &str) -> Result<ExportOutcome> {
        self.run_until_cancelled(body, &CancellationToken::new())
            .await
    }

    /// Run one queue payload, stopping early if `cancel` fires
    ///
    /// Cancellation before the publish step leaves the destination key untouched.
    pub async fn run_until_cancelled(
        &self,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome> {
        let fallback_id = request_id_hint(body);
        self.transition(&fallback_id, JobState::Received);

        let (job, client) = match self.validate(body) {
            Ok(validated) => validated,
            Err(e) => {
                self.fail(&fallback_id, &e);
                return Err(e);
            }
        };

        let request_id = job.extra.request_id.clone();
        self.transition(&request_id, JobState::Validated);

        let span = tracing::info_span!(
            "export",
            request_id = %request_id,
            key = %job.extra.storage_key,
            format = %job.params.format
        );

        let result = async {
            let work = self.execute(&job, client.as_ref());
            let bounded = async {
                match self.config.worker.job_timeout {
                    Some(deadline) => tokio::time::timeout(deadline, work)
                        .await
                        .map_err(|_| Error::DeadlineExceeded(deadline))?,
                    None => work.await,
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Error::Cancelled),
                result = bounded => result,
            }
        }
        .instrument(span)
        .await;

        match result {
            Ok(outcome) => {
                self.transition(&request_id, JobState::Succeeded);
                self.event_tx
                    .send(ExportEvent::Completed {
                        outcome: outcome.clone(),
                    })
                    .ok();
                Ok(outcome)
            }
            Err(e) => {
                self.fail(&request_id, &e);
                Err(e)
            }
        }
    }

    /// Decode the message and pick its environment's client; no network access
    fn validate(&self, body: &str) -> Result<(JobMessage, Arc<dyn SearchClient>)> {
        let job = parse_job_message(body)?;
        let client = self
            .clients
            .get(&job.extra.environment)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownEnvironment(job.extra.environment.clone()))?;
        Ok((job, client))
    }

    async fn execute(&self, job: &JobMessage, client: &dyn SearchClient) -> Result<ExportOutcome> {
        let request_id = job.extra.request_id.as_str();
        let params = &job.params;

        self.transition(request_id, JobState::Fetching);
        let fetcher = PaginatedFetcher::new(client, self.config.search.max_pages)
            .with_repeated_cursor_check(self.config.search.reject_repeated_cursors);
        let fetched = fetcher
            .fetch_all_with(
                &params.query,
                &params.variables,
                &params.item_path,
                &params.cursor_path,
                |page, items, total| {
                    self.event_tx
                        .send(ExportEvent::PageFetched {
                            request_id: request_id.to_string(),
                            page,
                            items,
                            total,
                        })
                        .ok();
                },
            )
            .await?;
        let pages = fetched.pages;

        tracing::info!(pages, items = fetched.items.len(), "search results fetched");

        self.transition(request_id, JobState::Encoding);
        let format = params.format;
        let columns = params.columns.clone();
        let separator = self.config.export.list_separator.clone();
        let items = fetched.items;
        let export = tokio::task::spawn_blocking(move || encode(&items, format, &columns, &separator))
            .await
            .map_err(|e| EncodingError::Io(std::io::Error::other(e.to_string())))??;
        let item_count = export.items;

        self.transition(request_id, JobState::Publishing);
        let bytes = self
            .publisher
            .publish(export, &job.extra.storage_key)
            .await?;

        Ok(ExportOutcome {
            request_id: request_id.to_string(),
            storage_key: job.extra.storage_key.clone(),
            filename: job.extra.filename.clone(),
            format,
            content_type: format.content_type().to_string(),
            items: item_count,
            pages,
            bytes,
            completed_at: chrono::Utc::now(),
        })
    }

    fn transition(&self, request_id: &str, state: JobState) {
        if state.is_terminal() {
            tracing::info!(request_id, state = ?state, "export finished");
        } else {
            tracing::info!(request_id, state = ?state, "export state changed");
        }
        self.event_tx
            .send(ExportEvent::StateChanged {
                request_id: request_id.to_string(),
                state,
            })
            .ok();
    }

    fn fail(&self, request_id: &str, error: &Error) {
        let retryable = error.is_retryable();
        tracing::error!(
            request_id,
            code = error.error_code(),
            retryable,
            error = %error,
            "export failed"
        );
        self.transition(request_id, JobState::Failed);
        self.event_tx
            .send(ExportEvent::Failed {
                request_id: request_id.to_string(),
                code: error.error_code().to_string(),
                error: error.to_string(),
                retryable,
            })
            .ok();
    }
}

/// `extra.requestId` if the payload is JSON enough to have one
fn request_id_hint(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/extra/requestId")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default()
}
