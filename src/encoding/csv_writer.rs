//! CSV export writer
//!
//! The header row is the column names. Each item becomes one row of projected
//! cells. Cells containing a comma, quote, CR or LF are quoted with inner quotes
//! doubled, and every line ends with CRLF. The one exception is a row made of
//! a single empty cell, which is written as `""` so that it is not read back as
//! a blank line.

use std::io::Write;

use serde_json::Value;

use super::ExportWriter;
use crate::error::EncodingError;
use crate::projection::ColumnProjector;

/// Writer for CSV format
pub struct CsvExportWriter<W: Write> {
    writer: csv::Writer<W>,
    projector: ColumnProjector,
    written: usize,
}

impl<W: Write> CsvExportWriter<W> {
    /// Create a writer and emit the header row
    pub fn new(sink: W, projector: ColumnProjector) -> Result<Self, EncodingError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(sink);

        writer.write_record(projector.header())?;
        tracing::debug!(columns = projector.columns().len(), "csv header written");

        Ok(Self {
            writer,
            projector,
            written: 0,
        })
    }
}

impl<W: Write> ExportWriter for CsvExportWriter<W> {
    type Output = W;

    fn write_item(&mut self, item: &Value) -> Result<(), EncodingError> {
        let row = self.projector.project(item);
        self.writer.write_record(row.values())?;
        self.written += 1;
        Ok(())
    }

    fn finish(self) -> Result<W, EncodingError> {
        self.writer
            .into_inner()
            .map_err(|e| EncodingError::Io(e.into_error()))
    }

    fn items_written(&self) -> usize {
        self.written
    }
}
