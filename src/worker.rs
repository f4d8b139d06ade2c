//! Queue-facing worker
//!
//! Takes a batch of queue records, runs each through the [`ExportPipeline`] and
//! reports which records should be redelivered. Only retryable failures are
//! reported; a message that can never succeed is logged and dropped so it does
//! not cycle through the queue forever.
//!
//! A record without a `messageId` is skipped with an error log. Its outcome
//! could not be reported back, and an empty identifier would make the queue
//! redeliver the whole batch.

use crate::error::{IsRetryable, Result};
use crate::pipeline::ExportPipeline;
use crate::types::{BatchItemFailure, BatchResponse, ExportOutcome, QueueEvent, QueueRecord};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs queue batches through an export pipeline
#[derive(Clone)]
pub struct ExportWorker {
    pipeline: Arc<ExportPipeline>,
    max_concurrent: usize,
    shutdown: CancellationToken,
}

impl ExportWorker {
    /// Create a worker; concurrency comes from `worker.max_concurrent_jobs`
    pub fn new(pipeline: Arc<ExportPipeline>) -> Self {
        let max_concurrent = pipeline.config().worker.max_concurrent_jobs.max(1);
        Self {
            pipeline,
            max_concurrent,
            shutdown: CancellationToken::new(),
        }
    }

    /// The pipeline records are run through
    pub fn pipeline(&self) -> &ExportPipeline {
        &self.pipeline
    }

    /// Process every record of `event`
    ///
    /// Records run concurrently, at most `max_concurrent_jobs` at a time. The
    /// response lists the message ids of records whose failure is retryable.
    pub async fn handle_event(&self, event: QueueEvent) -> BatchResponse {
        let total = event.records.len();
        tracing::info!(records = total, "handling queue batch");

        let (records, anonymous): (Vec<QueueRecord>, Vec<QueueRecord>) = event
            .records
            .into_iter()
            .partition(|record| !record.message_id.trim().is_empty());
        if !anonymous.is_empty() {
            tracing::error!(
                skipped = anonymous.len(),
                "queue records without messageId cannot be reported for redelivery, skipping them"
            );
        }

        let failures: Vec<BatchItemFailure> = stream::iter(records)
            .map(|record| async move {
                let result = self.handle_record(&record).await;
                (record.message_id, result)
            })
            .buffer_unordered(self.max_concurrent)
            .filter_map(|(message_id, result)| async move {
                match result {
                    Ok(_) => None,
                    Err(e) if e.is_retryable() => {
                        tracing::warn!(message_id = %message_id, error = %e, "record will be redelivered");
                        Some(BatchItemFailure {
                            item_identifier: message_id,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(
                            message_id = %message_id,
                            code = e.error_code(),
                            error = %e,
                            "dropping record that cannot succeed"
                        );
                        None
                    }
                }
            })
            .collect()
            .await;

        tracing::info!(
            records = total,
            redeliver = failures.len(),
            "queue batch handled"
        );

        BatchResponse {
            batch_item_failures: failures,
        }
    }

    /// Run a single record
    pub async fn handle_record(&self, record: &QueueRecord) -> Result<ExportOutcome> {
        self.pipeline
            .run_until_cancelled(&record.body, &self.shutdown)
            .await
    }

    /// Cancel in-flight and future runs
    ///
    /// Cancelled runs are reported as retryable so the queue redelivers them.
    pub fn shutdown(&self) {
        tracing::info!("export worker shutting down");
        self.shutdown.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
