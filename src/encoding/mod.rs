//! Export encoders
//!
//! Both formats implement [`ExportWriter`]: items go in one at a time and the
//! finished bytes come out of `finish`. The pipeline currently buffers the whole
//! export in a `Vec<u8>` before publishing, but the writers themselves only need
//! an [`std::io::Write`] sink.
//!
//! CSV projects every item through the job's columns. JSON writes the raw items
//! untouched and ignores the columns.

pub mod csv_writer;
pub mod json_writer;

pub use csv_writer::CsvExportWriter;
pub use json_writer::JsonExportWriter;

use crate::error::EncodingError;
use crate::projection::ColumnProjector;
use crate::types::{ColumnDefinition, ExportFormat};
use serde_json::Value;

/// Trait for incremental export serialization
pub trait ExportWriter {
    /// The sink handed back by `finish`
    type Output;

    /// Serialize one raw item
    fn write_item(&mut self, item: &Value) -> Result<(), EncodingError>;

    /// Write any trailer, flush, and return the sink
    fn finish(self) -> Result<Self::Output, EncodingError>;

    /// Number of items written so far
    fn items_written(&self) -> usize;
}

/// A fully encoded export
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedExport {
    /// Serialized bytes
    pub body: Vec<u8>,
    /// Format of `body`
    pub format: ExportFormat,
    /// Number of items in `body`
    pub items: usize,
}

impl EncodedExport {
    /// MIME type of `body`
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Encode `items` in `format`
///
/// `columns` and `list_separator` only matter for CSV.
pub fn encode(
    items: &[Value],
    format: ExportFormat,
    columns: &[ColumnDefinition],
    list_separator: &str,
) -> Result<EncodedExport, EncodingError> {
    let body = match format {
        ExportFormat::Csv => {
            let projector = ColumnProjector::new(columns.to_vec(), list_separator);
            write_all(CsvExportWriter::new(Vec::new(), projector)?, items)?
        }
        ExportFormat::Json => write_all(JsonExportWriter::new(Vec::new())?, items)?,
    };

    tracing::debug!(
        format = %format,
        items = items.len(),
        bytes = body.len(),
        "export encoded"
    );

    Ok(EncodedExport {
        body,
        format,
        items: items.len(),
    })
}

fn write_all<W: ExportWriter>(mut writer: W, items: &[Value]) -> Result<W::Output, EncodingError> {
    for item in items {
        writer.write_item(item)?;
    }
    writer.finish()
}
