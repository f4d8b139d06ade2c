//! Core types for search-export

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One output column: header name plus the dot path it is read from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Output header (CSV) name
    pub name: String,
    /// Dot path into a raw item, e.g. "platforms.shortName"
    pub path: String,
}

impl ColumnDefinition {
    /// Create a column definition
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Output format of an export
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Projected columns, one row per item
    Csv,
    /// Raw items as a single JSON array
    Json,
}

impl ExportFormat {
    /// MIME type written alongside the export
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(crate::error::ValidationError::UnsupportedFormat(
                other.to_string(),
            )),
        }
    }
}

/// What to fetch and how to shape it
#[derive(Clone, Debug, PartialEq)]
pub struct JobParams {
    /// Ordered output columns (CSV only)
    pub columns: Vec<ColumnDefinition>,
    /// Dot path to the pagination cursor inside the response `data`
    pub cursor_path: String,
    /// Dot path to the page's item list inside the response `data`
    pub item_path: String,
    /// Requested output format
    pub format: ExportFormat,
    /// GraphQL document, forwarded as-is
    pub query: Value,
    /// GraphQL variables; the cursor is merged in per page
    pub variables: Map<String, Value>,
}

/// Where the export goes and which environment it queries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobMetadata {
    /// Deployment environment whose search endpoint is queried
    pub environment: String,
    /// Suggested download file name
    pub filename: String,
    /// Object store key of the finished export
    pub storage_key: String,
    /// Correlation id, used only for logging and events
    pub request_id: String,
}

/// A fully validated export job
#[derive(Clone, Debug, PartialEq)]
pub struct JobMessage {
    /// Fetch and shaping parameters
    pub params: JobParams,
    /// Destination and traceability
    pub extra: JobMetadata,
}

/// Pipeline state of one export run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Message taken off the queue
    Received,
    /// Message decoded and checked
    Validated,
    /// Pages are being requested
    Fetching,
    /// Items are being serialized
    Encoding,
    /// The export is being written
    Publishing,
    /// The export is stored
    Succeeded,
    /// The run stopped with an error
    Failed,
}

impl JobState {
    /// Whether the run is over
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Event emitted during an export run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportEvent {
    /// The run moved to a new state
    StateChanged {
        /// Correlation id (empty while the message is still undecoded)
        request_id: String,
        /// New state
        state: JobState,
    },

    /// One non-empty page arrived
    PageFetched {
        /// Correlation id
        request_id: String,
        /// 1-based page number
        page: usize,
        /// Items on this page
        items: usize,
        /// Items accumulated so far
        total: usize,
    },

    /// The export was stored
    Completed {
        /// Summary of the finished run
        outcome: ExportOutcome,
    },

    /// The run failed
    Failed {
        /// Correlation id (empty if the message never decoded)
        request_id: String,
        /// Machine-readable error code
        code: String,
        /// Error message
        error: String,
        /// Whether redelivering the job may succeed
        retryable: bool,
    },
}

/// Summary of a successful export run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOutcome {
    /// Correlation id
    pub request_id: String,
    /// Object store key written
    pub storage_key: String,
    /// Suggested download file name
    pub filename: String,
    /// Format written
    pub format: ExportFormat,
    /// MIME type written
    pub content_type: String,
    /// Number of items exported
    pub items: usize,
    /// Number of non-empty pages fetched
    pub pages: usize,
    /// Size of the stored object in bytes
    pub bytes: usize,
    /// When the write was acknowledged
    pub completed_at: DateTime<Utc>,
}

/// A batch of queue deliveries
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Delivered records
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

/// One queue delivery
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    /// Queue-assigned id, echoed back for failed records (empty when absent;
    /// the worker skips such records)
    #[serde(default)]
    pub message_id: String,
    /// Raw job message JSON
    pub body: String,
}

/// Records the queue should deliver again
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Failed records eligible for redelivery
    pub batch_item_failures: Vec<BatchItemFailure>,
}

/// One record to redeliver
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    /// The record's `messageId`
    pub item_identifier: String,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_final_states_are_terminal() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        for state in [
            JobState::Received,
            JobState::Validated,
            JobState::Fetching,
            JobState::Encoding,
            JobState::Publishing,
        ] {
            assert!(!state.is_terminal(), "{state:?}");
        }
    }

    #[test]
    fn format_parses_known_values_only() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("CSV".parse::<ExportFormat>().is_err());
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn format_content_types() {
        assert_eq!(ExportFormat::Csv.content_type(), "text/csv");
        assert_eq!(ExportFormat::Json.content_type(), "application/json");
    }

    #[test]
    fn queue_event_uses_queue_field_names() {
        let event: QueueEvent = serde_json::from_str(
            r#"{"Records": [{"messageId": "m-1", "body": "{}"}, {"body": "{}"}]}"#,
        )
        .unwrap();

        assert_eq!(event.records.len(), 2);
        assert_eq!(event.records[0].message_id, "m-1");
        assert_eq!(event.records[1].message_id, "");
    }

    #[test]
    fn batch_response_serializes_in_queue_shape() {
        let response = BatchResponse {
            batch_item_failures: vec![BatchItemFailure {
                item_identifier: "m-1".into(),
            }],
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"batchItemFailures": [{"itemIdentifier": "m-1"}]})
        );
    }

    #[test]
    fn event_is_tagged_by_type() {
        let event = ExportEvent::StateChanged {
            request_id: "r".into(),
            state: JobState::Fetching,
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "state_changed", "request_id": "r", "state": "fetching"})
        );
    }
}
