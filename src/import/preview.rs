//! Preview sampling for the field-selection surface.
//!
//! Runs the parser over a bounded prefix of the file, without the blank
//! filter and without ever touching the sink, to produce the union of
//! observed field paths (first-seen order preserved), sample values per
//! path and a best-effort type suggestion. Used only to let an external
//! surface render field choices; never part of a committed job run.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::codec::{self, FieldType};
use crate::config::FileFormat;
use crate::error::Result;
use crate::parser::make_parser;

/// Default number of records sampled.
pub const PREVIEW_RECORDS: usize = 10;

/// One observed field path with sample values.
#[derive(Debug, Clone)]
pub struct FieldSample {
    /// Dotted leaf path.
    pub path: String,

    /// Best-effort type suggestion from the sampled values. Defaults to
    /// string whenever the samples disagree.
    pub suggested_type: FieldType,

    /// Flat-text sample values, one per sampled record where present.
    pub values: Vec<String>,
}

/// Result of sampling a file prefix.
#[derive(Debug, Clone, Default)]
pub struct Preview {
    /// Observed field paths in first-seen order.
    pub fields: Vec<FieldSample>,

    /// Number of records inspected.
    pub records_sampled: u64,
}

/// Sample the first `limit` records of a file.
///
/// # Arguments
/// * `path` - File to sample
/// * `format` - File format
/// * `delimiter` - CSV delimiter
/// * `limit` - Maximum records to inspect
pub fn preview_file(
    path: impl AsRef<Path>,
    format: FileFormat,
    delimiter: u8,
    limit: usize,
) -> Result<Preview> {
    let file = File::open(path.as_ref())?;
    let mut parser = make_parser(Box::new(file), format, delimiter);

    let mut fields: Vec<FieldSample> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut sampled = 0u64;

    while sampled < limit as u64 {
        let record = match parser.next_record()? {
            Some(record) => record,
            None => break,
        };
        sampled += 1;

        codec::for_each_leaf(&record.doc, |path, value| {
            let i = *index.entry(path.to_string()).or_insert_with(|| {
                fields.push(FieldSample {
                    path: path.to_string(),
                    suggested_type: FieldType::String,
                    values: Vec::new(),
                });
                fields.len() - 1
            });
            if fields[i].values.len() < limit {
                fields[i].values.push(codec::to_text(value));
            }
        });
    }

    for field in &mut fields {
        field.suggested_type = suggest_type(&field.values);
    }

    debug!(
        "preview sampled {} records, {} fields",
        sampled,
        fields.len()
    );
    Ok(Preview {
        fields,
        records_sampled: sampled,
    })
}

/// Suggest a type when every non-empty sample agrees; otherwise string.
fn suggest_type(values: &[String]) -> FieldType {
    let mut suggestion: Option<FieldType> = None;
    for value in values.iter().filter(|v| !v.is_empty()) {
        let this = suggest_one(value);
        match suggestion {
            None => suggestion = Some(this),
            Some(prev) if prev == this => {}
            Some(_) => return FieldType::String,
        }
    }
    suggestion.unwrap_or(FieldType::String)
}

fn suggest_one(value: &str) -> FieldType {
    if value.len() == 24 && value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return FieldType::ObjectId;
    }
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return FieldType::Boolean;
    }
    if value.parse::<i32>().is_ok() {
        return FieldType::Int32;
    }
    if value.parse::<i64>().is_ok() {
        return FieldType::Int64;
    }
    if value.parse::<f64>().is_ok() {
        return FieldType::Double;
    }
    if bson::DateTime::parse_rfc3339_str(value).is_ok() {
        return FieldType::Date;
    }
    FieldType::String
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_preview_collects_fields_in_first_seen_order() {
        let file = write_temp("id,name,age\n1,Arlo,5\n2,Basil,3\n");
        let preview =
            preview_file(file.path(), FileFormat::Csv, b',', PREVIEW_RECORDS).unwrap();
        let paths: Vec<_> = preview.fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["id", "name", "age"]);
        assert_eq!(preview.records_sampled, 2);
    }

    #[test]
    fn test_preview_is_bounded() {
        let mut contents = String::from("n\n");
        for i in 0..100 {
            contents.push_str(&format!("{i}\n"));
        }
        let file = write_temp(&contents);
        let preview = preview_file(file.path(), FileFormat::Csv, b',', 5).unwrap();
        assert_eq!(preview.records_sampled, 5);
        assert_eq!(preview.fields[0].values.len(), 5);
    }

    #[test]
    fn test_preview_unions_jsonl_fields() {
        let file = write_temp("{\"a\": 1}\n{\"b\": {\"c\": 2}}\n");
        let preview =
            preview_file(file.path(), FileFormat::JsonLines, b',', PREVIEW_RECORDS).unwrap();
        let paths: Vec<_> = preview.fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b.c"]);
    }

    #[test]
    fn test_type_suggestions() {
        assert_eq!(suggest_one("5dd080acc15c0d5ee3ab6ad2"), FieldType::ObjectId);
        assert_eq!(suggest_one("true"), FieldType::Boolean);
        assert_eq!(suggest_one("42"), FieldType::Int32);
        assert_eq!(suggest_one("9000000000"), FieldType::Int64);
        assert_eq!(suggest_one("1.5"), FieldType::Double);
        assert_eq!(suggest_one("2017-01-13T00:00:00Z"), FieldType::Date);
        assert_eq!(suggest_one("Arlo"), FieldType::String);
    }

    #[test]
    fn test_disagreeing_samples_fall_back_to_string() {
        assert_eq!(
            suggest_type(&["1".to_string(), "Arlo".to_string()]),
            FieldType::String
        );
    }
}
