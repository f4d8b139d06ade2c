//! Job message decoding and validation
//!
//! Queue payloads are decoded into loosely typed wire structs first so that a
//! missing field can be reported by name, then checked and converted into a
//! [`JobMessage`]. Nothing here touches the network.

use crate::error::ValidationError;
use crate::types::{ColumnDefinition, ExportFormat, JobMessage, JobMetadata, JobParams};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct WireMessage {
    params: Option<WireParams>,
    extra: Option<WireExtra>,
}

#[derive(Debug, Deserialize)]
struct WireParams {
    columns: Option<Vec<WireColumn>>,
    #[serde(rename = "cursorpath")]
    cursor_path: Option<String>,
    #[serde(rename = "itempath")]
    item_path: Option<String>,
    format: Option<String>,
    query: Option<Value>,
    variables: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireColumn {
    name: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireExtra {
    earthdata_environment: Option<String>,
    filename: Option<String>,
    key: Option<String>,
    request_id: Option<String>,
}

/// Decode and validate a queue payload
///
/// # Errors
///
/// Returns a [`ValidationError`] if the payload is not JSON, a required field
/// is missing or empty, the format is unknown, or the storage key is unusable.
pub fn parse_job_message(body: &str) -> Result<JobMessage, ValidationError> {
    let wire: WireMessage =
        serde_json::from_str(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let params = wire
        .params
        .ok_or_else(|| ValidationError::MissingField("params".to_string()))?;
    let extra = wire
        .extra
        .ok_or_else(|| ValidationError::MissingField("extra".to_string()))?;

    let format: ExportFormat = required(params.format, "params.format")?.parse()?;

    let columns = params
        .columns
        .ok_or_else(|| ValidationError::MissingField("params.columns".to_string()))?
        .into_iter()
        .enumerate()
        .map(|(i, column)| {
            Ok(ColumnDefinition {
                name: column
                    .name
                    .ok_or_else(|| ValidationError::MissingField(format!("params.columns[{i}].name")))?,
                path: required(column.path, &format!("params.columns[{i}].path"))?,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    if format == ExportFormat::Csv && columns.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "params.columns".to_string(),
            reason: "CSV exports need at least one column".to_string(),
        });
    }

    let query = match params.query {
        None | Some(Value::Null) => {
            return Err(ValidationError::MissingField("params.query".to_string()));
        }
        Some(query) => query,
    };

    let variables = match params.variables {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ValidationError::InvalidField {
                field: "params.variables".to_string(),
                reason: "must be an object".to_string(),
            });
        }
    };

    let storage_key = required(extra.key, "extra.key")?;
    validate_storage_key(&storage_key)?;

    Ok(JobMessage {
        params: JobParams {
            columns,
            cursor_path: required(params.cursor_path, "params.cursorpath")?,
            item_path: required(params.item_path, "params.itempath")?,
            format,
            query,
            variables,
        },
        extra: JobMetadata {
            environment: required(extra.earthdata_environment, "extra.earthdataEnvironment")?,
            filename: extra
                .filename
                .ok_or_else(|| ValidationError::MissingField("extra.filename".to_string()))?,
            storage_key,
            request_id: required(extra.request_id, "extra.requestId")?,
        },
    })
}

/// Present and non-empty
fn required(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field.to_string())),
    }
}

/// Keys are relative, slash-separated, with no `.`/`..` segments
fn validate_storage_key(key: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidField {
        field: "extra.key".to_string(),
        reason: reason.to_string(),
    };

    if key.starts_with('/') {
        return Err(invalid("must be relative"));
    }
    if key.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
        return Err(invalid("contains an empty, `.` or `..` segment"));
    }
    if key.contains('\\') || key.contains('\0') {
        return Err(invalid("contains a backslash or NUL"));
    }

    Ok(())
}
