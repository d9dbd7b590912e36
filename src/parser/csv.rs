//! CSV record parsing.

use std::io::Read;

use bson::{Bson, Document};
use tracing::debug;

use crate::error::{ParseError, Result};

use super::{RawRecord, RecordParser};

/// Streaming CSV parser.
///
/// The first row is always treated as header names. Physically empty rows
/// are skipped. Rows with more fields than headers have the extras
/// ignored; rows with fewer simply omit the trailing fields.
pub struct CsvRecordParser {
    reader: csv::Reader<Box<dyn Read + Send>>,
    headers: Option<Vec<String>>,
    last_offset: u64,
}

impl CsvRecordParser {
    /// Create a parser over a byte source.
    ///
    /// # Arguments
    /// * `reader` - Byte source positioned at the start of the file
    /// * `delimiter` - Field delimiter
    pub fn new(reader: Box<dyn Read + Send>, delimiter: u8) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Self {
            reader,
            headers: None,
            last_offset: 0,
        }
    }

    fn load_headers(&mut self) -> Result<()> {
        if self.headers.is_some() {
            return Ok(());
        }
        let headers = self.reader.headers().map_err(crate::error::MongoportError::from)?;
        if headers.is_empty() {
            return Err(ParseError::MissingHeader.into());
        }
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        debug!("CSV headers: {:?}", names);
        self.headers = Some(names);
        self.last_offset = self.reader.position().byte();
        Ok(())
    }
}

impl RecordParser for CsvRecordParser {
    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        self.load_headers()?;

        let mut record = csv::StringRecord::new();
        let bytes = loop {
            let more = self
                .reader
                .read_record(&mut record)
                .map_err(crate::error::MongoportError::from)?;
            if !more {
                return Ok(None);
            }

            let offset = self.reader.position().byte();
            let bytes = offset.saturating_sub(self.last_offset);
            self.last_offset = offset;

            // ignoreEmpty: a physically blank row is not a record
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            break bytes;
        };

        let headers = match self.headers.as_deref() {
            Some(headers) => headers,
            None => return Ok(None),
        };
        let mut doc = Document::new();
        for (i, name) in headers.iter().enumerate() {
            if let Some(value) = record.get(i) {
                doc.insert(name.clone(), Bson::String(value.to_string()));
            }
        }
        Ok(Some(RawRecord { doc, bytes }))
    }
}
