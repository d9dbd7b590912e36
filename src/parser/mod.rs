//! Record parsers for the import side of the pipeline.
//!
//! Each parser turns a byte stream into a lazy, finite, forward-only
//! sequence of [`RawRecord`]s. Parsers are not restartable once consumed;
//! upstream read errors surface as stage errors; cancellation is checked
//! by the pipeline driver between records.
//!
//! - CSV rows become flat documents with string leaves keyed by header
//!   (dotted headers stay flat keys until projection unflattens them)
//! - JSON records are parsed and extended-JSON tags resolved, so typed
//!   values arrive already materialized

use std::io::Read;

use bson::Document;

use crate::config::FileFormat;
use crate::error::Result;

pub mod csv;
pub mod json;

pub use csv::CsvRecordParser;
pub use json::{JsonArrayParser, JsonLinesParser};

#[cfg(test)]
mod tests;

/// One parsed but not-yet-coerced record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// The record body. CSV leaves are all strings; JSON leaves are
    /// already typed.
    pub doc: Document,

    /// Approximate bytes of input consumed producing this record,
    /// including separators. Drives progress reporting.
    pub bytes: u64,
}

/// A forward-only source of raw records.
pub trait RecordParser: Send {
    /// Produce the next record, or `None` at end of input.
    fn next_record(&mut self) -> Result<Option<RawRecord>>;
}

/// Construct the parser matching a file format.
///
/// # Arguments
/// * `reader` - Byte source, typically a file
/// * `format` - Detected or configured file format
/// * `delimiter` - CSV field delimiter; ignored for JSON formats
pub fn make_parser(
    reader: Box<dyn Read + Send>,
    format: FileFormat,
    delimiter: u8,
) -> Box<dyn RecordParser> {
    match format {
        FileFormat::Csv => Box::new(CsvRecordParser::new(reader, delimiter)),
        FileFormat::Json => Box::new(JsonArrayParser::new(reader)),
        FileFormat::JsonLines => Box::new(JsonLinesParser::new(reader)),
    }
}
