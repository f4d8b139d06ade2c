//! # search-export
//!
//! Asynchronous export worker for paginated GraphQL search results.
//!
//! A job message names a GraphQL query, where the result items and the next-page
//! cursor live in each response, and how to render the items. The worker pages
//! through the whole result set, renders it as CSV (one column per configured
//! path) or as a JSON array of the raw items, and writes the file to an object
//! store under the requested key.
//!
//! ## Quick Start
//!
//! ```no_run
//! use search_export::{Config, ExportPipeline, ExportWorker, QueueEvent};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("search-export.json")?.with_env_overrides();
//!     let pipeline = Arc::new(ExportPipeline::new(config)?);
//!
//!     // Follow progress
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let worker = ExportWorker::new(pipeline);
//!     let batch: QueueEvent = serde_json::from_str(&std::fs::read_to_string("batch.json")?)?;
//!     let response = worker.handle_event(batch).await;
//!     println!("{}", serde_json::to_string(&response)?);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// CSV and JSON encoders
pub mod encoding;
/// Error types
pub mod error;
/// Job message decoding and validation
pub mod job;
/// Dotted path extraction over JSON values
pub mod path;
/// Export orchestration
pub mod pipeline;
/// Column projection for tabular output
pub mod projection;
/// GraphQL search client and pagination
pub mod search;
/// Object storage backends
pub mod storage;
/// Core types
pub mod types;
/// Queue batch handling
pub mod worker;

pub use config::{Config, EnvironmentConfig, StorageBackend};
pub use error::{Error, IsRetryable, Result};
pub use pipeline::ExportPipeline;
pub use types::{
    BatchItemFailure, BatchResponse, ColumnDefinition, ExportEvent, ExportFormat, ExportOutcome,
    JobMessage, JobState, QueueEvent, QueueRecord,
};
pub use worker::ExportWorker;

/// Cancel `worker` when the process receives SIGTERM or SIGINT
///
/// In-flight runs end with [`Error::Cancelled`] and are reported for redelivery.
///
/// # Example
///
/// ```no_run
/// use search_export::{Config, ExportPipeline, ExportWorker, shutdown_on_signal};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Arc::new(ExportPipeline::new(Config::default())?);
///     let worker = ExportWorker::new(pipeline);
///
///     tokio::spawn(shutdown_on_signal(worker.clone()));
///     Ok(())
/// }
/// ```
pub async fn shutdown_on_signal(worker: ExportWorker) {
    wait_for_signal().await;
    worker.shutdown();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        Err(e) => {
            // Restricted environments may refuse the handler
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for Ctrl+C only");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
    }
}
