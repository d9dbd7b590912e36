//! JSON array and JSON lines record parsing.
//!
//! Both parsers resolve extended-JSON tags (`$oid`, `$date`,
//! `$numberDecimal`, ...) into typed BSON values as records are produced.
//! The array parser splits top-level elements incrementally with a
//! depth- and quote-aware byte scanner, so a large array streams without
//! being materialized whole.

use std::io::{BufRead, BufReader, Read};

use bson::Bson;
use serde_json::Value as JsonValue;

use crate::detect::BOM;
use crate::error::{ParseError, Result};

use super::{RawRecord, RecordParser};

/// Parse one JSON text into a raw record, resolving extended JSON.
fn value_to_record(text: &str, record_no: u64, bytes: u64) -> Result<RawRecord> {
    let json: JsonValue = serde_json::from_str(text).map_err(|e| ParseError::Json {
        record: record_no,
        message: e.to_string(),
    })?;
    let bson = Bson::try_from(json).map_err(|e| ParseError::Json {
        record: record_no,
        message: e.to_string(),
    })?;
    match bson {
        Bson::Document(doc) => Ok(RawRecord { doc, bytes }),
        _ => Err(ParseError::Json {
            record: record_no,
            message: String::from("expected an object"),
        }
        .into()),
    }
}

/// Streaming parser for a single top-level JSON array of objects.
pub struct JsonArrayParser {
    reader: BufReader<Box<dyn Read + Send>>,
    started: bool,
    finished: bool,
    record_no: u64,
    /// Bytes consumed since the last record was returned.
    pending_bytes: u64,
}

impl JsonArrayParser {
    /// Create a parser over a byte source.
    pub fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader: BufReader::new(reader),
            started: false,
            finished: false,
            record_no: 0,
            pending_bytes: 0,
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        let n = self.reader.read(&mut buf)?;
        if n == 0 {
            Ok(None)
        } else {
            self.pending_bytes += 1;
            Ok(Some(buf[0]))
        }
    }

    /// Consume whitespace (and a leading BOM) and return the next
    /// significant byte.
    fn next_significant(&mut self) -> Result<Option<u8>> {
        let mut bom = Vec::new();
        loop {
            match self.next_byte()? {
                None => return Ok(None),
                Some(b) if !self.started && bom.len() < BOM.len() && b == BOM[bom.len()] => {
                    bom.push(b);
                }
                Some(b) if b.is_ascii_whitespace() => {}
                Some(b) => return Ok(Some(b)),
            }
        }
    }

    /// Read one complete JSON value starting with `first`, tracking
    /// string and nesting state.
    fn read_element(&mut self, first: u8) -> Result<(Vec<u8>, Option<u8>)> {
        let mut out = vec![first];

        if first == b'{' || first == b'[' {
            let mut depth: i64 = 1;
            let mut in_string = false;
            let mut escaped = false;
            while depth > 0 {
                let b = self.next_byte()?.ok_or(ParseError::UnexpectedEof)?;
                out.push(b);
                if in_string {
                    if escaped {
                        escaped = false;
                    } else if b == b'\\' {
                        escaped = true;
                    } else if b == b'"' {
                        in_string = false;
                    }
                } else {
                    match b {
                        b'"' => in_string = true,
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' => depth -= 1,
                        _ => {}
                    }
                }
            }
            Ok((out, None))
        } else if first == b'"' {
            let mut escaped = false;
            loop {
                let b = self.next_byte()?.ok_or(ParseError::UnexpectedEof)?;
                out.push(b);
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    return Ok((out, None));
                }
            }
        } else {
            // Bare scalar: runs until a separator or the closing bracket
            loop {
                match self.next_byte()? {
                    None => return Err(ParseError::UnexpectedEof.into()),
                    Some(b) if b == b',' || b == b']' => return Ok((out, Some(b))),
                    Some(b) if b.is_ascii_whitespace() => return Ok((out, None)),
                    Some(b) => out.push(b),
                }
            }
        }
    }
}

impl RecordParser for JsonArrayParser {
    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        if self.finished {
            return Ok(None);
        }

        if !self.started {
            match self.next_significant()? {
                Some(b'[') => self.started = true,
                Some(other) => {
                    return Err(ParseError::Json {
                        record: 0,
                        message: format!("expected '[', found {:?}", other as char),
                    }
                    .into());
                }
                None => return Err(ParseError::UnexpectedEof.into()),
            }
        }

        // Skip the separator (or detect the end of the array)
        let first = loop {
            match self.next_significant()? {
                None => return Err(ParseError::UnexpectedEof.into()),
                Some(b']') => {
                    self.finished = true;
                    return Ok(None);
                }
                Some(b',') => continue,
                Some(b) => break b,
            }
        };

        let (element, terminator) = self.read_element(first)?;
        if terminator == Some(b']') {
            self.finished = true;
        }

        self.record_no += 1;
        let bytes = std::mem::take(&mut self.pending_bytes);
        // Invalid UTF-8 poisons this element only; the scanner already
        // consumed it, so the next call resumes at the separator
        let text = std::str::from_utf8(&element).map_err(|e| ParseError::Json {
            record: self.record_no,
            message: e.to_string(),
        })?;
        let record = value_to_record(text, self.record_no, bytes)?;
        Ok(Some(record))
    }
}

/// Streaming parser for JSON lines (one object per line).
///
/// Tolerates a BOM on the first line and blank lines between records.
pub struct JsonLinesParser {
    reader: BufReader<Box<dyn Read + Send>>,
    record_no: u64,
    first_line: bool,
}

impl JsonLinesParser {
    /// Create a parser over a byte source.
    pub fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader: BufReader::new(reader),
            record_no: 0,
            first_line: true,
        }
    }
}

impl RecordParser for JsonLinesParser {
    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line)?;
            if n == 0 {
                return Ok(None);
            }

            let mut text = line.trim();
            if self.first_line {
                self.first_line = false;
                text = text.trim_start_matches('\u{feff}');
            }
            if text.is_empty() {
                continue;
            }

            self.record_no += 1;
            let record = value_to_record(text, self.record_no, n as u64)?;
            return Ok(Some(record));
        }
    }
}
