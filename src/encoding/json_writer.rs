//! JSON export writer
//!
//! Writes the raw items as one compact JSON array, element by element, so the
//! array never has to exist as a single `Value`.

use std::io::Write;

use serde_json::Value;

use super::ExportWriter;
use crate::error::EncodingError;

/// Writer for JSON array format
pub struct JsonExportWriter<W: Write> {
    sink: W,
    written: usize,
}

impl<W: Write> JsonExportWriter<W> {
    /// Create a writer and open the array
    pub fn new(mut sink: W) -> Result<Self, EncodingError> {
        sink.write_all(b"[")?;
        Ok(Self { sink, written: 0 })
    }
}

impl<W: Write> ExportWriter for JsonExportWriter<W> {
    type Output = W;

    fn write_item(&mut self, item: &Value) -> Result<(), EncodingError> {
        if self.written > 0 {
            self.sink.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.sink, item)?;
        self.written += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<W, EncodingError> {
        self.sink.write_all(b"]")?;
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn items_written(&self) -> usize {
        self.written
    }
}
