//! File format detection for import.
//!
//! Sniffs the first few KiB of a file to classify it as CSV, a JSON array,
//! or JSON lines, and guesses a probable CSV delimiter by frequency
//! analysis on the first non-empty line. Only an empty file is
//! undetectable; ambiguous content defaults to CSV.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::FileFormat;
use crate::error::{ConfigError, Result};

/// Number of bytes sniffed from the start of the file.
const SNIFF_BYTES: usize = 8 * 1024;

/// UTF-8 byte-order mark.
pub const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Candidate CSV delimiters, in tie-break priority order.
const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b' '];

/// Outcome of format detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detected {
    /// Detected file format.
    pub format: FileFormat,

    /// Probable field delimiter. Only meaningful for CSV; defaults to a
    /// comma otherwise.
    pub delimiter: u8,
}

/// Classify a byte prefix as CSV, JSON array or JSON lines.
///
/// # Arguments
/// * `prefix` - The first few KiB of the file
///
/// # Returns
/// * `Result<Detected>` - Format and delimiter, or an undetectable-format
///   error for empty input
pub fn detect_format(prefix: &[u8]) -> Result<Detected> {
    let stripped = strip_bom(prefix);
    let text = String::from_utf8_lossy(stripped);
    let trimmed = text.trim_start();

    if trimmed.is_empty() {
        return Err(ConfigError::UndetectableFormat(String::from("empty file")).into());
    }

    if trimmed.starts_with('[') {
        debug!("detected JSON array input");
        return Ok(Detected {
            format: FileFormat::Json,
            delimiter: b',',
        });
    }

    if trimmed.starts_with('{') {
        // A first line that is a complete JSON object means one object per
        // line; a partial object is still most likely JSONL with a record
        // longer than the sniff window.
        let first_line = trimmed.lines().next().unwrap_or(trimmed);
        if serde_json::from_str::<JsonValue>(first_line.trim_end()).is_ok()
            || trimmed.lines().count() <= 1
        {
            debug!("detected JSON lines input");
            return Ok(Detected {
                format: FileFormat::JsonLines,
                delimiter: b',',
            });
        }
    }

    let delimiter = guess_delimiter(trimmed);
    debug!("detected CSV input with delimiter {:?}", delimiter as char);
    Ok(Detected {
        format: FileFormat::Csv,
        delimiter,
    })
}

/// Sniff a file on disk: read the prefix and detect its format.
///
/// # Arguments
/// * `path` - File to sniff
///
/// # Returns
/// * `Result<(Detected, u64)>` - Detection outcome plus total file size
pub fn detect_file(path: impl AsRef<Path>) -> Result<(Detected, u64)> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
    let size = file.metadata()?.len();

    let mut buf = vec![0u8; SNIFF_BYTES];
    let read = file.read(&mut buf)?;
    buf.truncate(read);

    let detected = detect_format(&buf).map_err(|_| {
        crate::error::MongoportError::from(ConfigError::UndetectableFormat(
            path.display().to_string(),
        ))
    })?;
    Ok((detected, size))
}

/// Strip a UTF-8 BOM prefix if present.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(BOM).unwrap_or(bytes)
}

/// Pick the most frequent candidate delimiter on the first non-empty
/// line, counting only occurrences outside double-quoted sections.
fn guess_delimiter(text: &str) -> u8 {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");

    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = DELIMITERS.iter().position(|&d| d == b) {
            counts[i] += 1;
        }
    }

    let (best, &count) = counts
        .iter()
        .enumerate()
        .max_by_key(|&(i, &c)| (c, std::cmp::Reverse(i)))
        .unwrap_or((0, &0));
    if count == 0 { b',' } else { DELIMITERS[best] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_json_array() {
        let d = detect_format(b"[{\"a\": 1}, {\"a\": 2}]").unwrap();
        assert_eq!(d.format, FileFormat::Json);
    }

    #[test]
    fn test_detect_json_lines() {
        let d = detect_format(b"{\"a\": 1}\n{\"a\": 2}\n").unwrap();
        assert_eq!(d.format, FileFormat::JsonLines);
    }

    #[test]
    fn test_detect_csv_with_comma() {
        let d = detect_format(b"id,name,age\n1,Arlo,5\n").unwrap();
        assert_eq!(d.format, FileFormat::Csv);
        assert_eq!(d.delimiter, b',');
    }

    #[test]
    fn test_detect_csv_with_semicolon() {
        let d = detect_format(b"id;name;age\n1;Arlo;5\n").unwrap();
        assert_eq!(d.format, FileFormat::Csv);
        assert_eq!(d.delimiter, b';');
    }

    #[test]
    fn test_detect_csv_with_tab() {
        let d = detect_format(b"id\tname\n1\tArlo\n").unwrap();
        assert_eq!(d.delimiter, b'\t');
    }

    #[test]
    fn test_quoted_delimiters_ignored() {
        // The commas inside quotes must not outvote the semicolons
        let d = detect_format(b"\"a,b,c,d\";x\n").unwrap();
        assert_eq!(d.delimiter, b';');
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = BOM.to_vec();
        bytes.extend_from_slice(b"[{\"a\": 1}]");
        let d = detect_format(&bytes).unwrap();
        assert_eq!(d.format, FileFormat::Json);
    }

    #[test]
    fn test_empty_file_is_undetectable() {
        assert!(detect_format(b"").is_err());
        assert!(detect_format(b"   \n  ").is_err());
    }

    #[test]
    fn test_ambiguous_defaults_to_csv() {
        let d = detect_format(b"just one plain line").unwrap();
        assert_eq!(d.format, FileFormat::Csv);
        assert_eq!(d.delimiter, b' ');
    }
}
