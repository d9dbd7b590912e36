//! Tests for the record parsers

use bson::{Bson, doc};

use super::*;
use crate::config::FileFormat;

fn parser_over(bytes: &[u8], format: FileFormat, delimiter: u8) -> Box<dyn RecordParser> {
    make_parser(Box::new(std::io::Cursor::new(bytes.to_vec())), format, delimiter)
}

fn drain(mut parser: Box<dyn RecordParser>) -> Vec<RawRecord> {
    let mut out = Vec::new();
    while let Some(record) = parser.next_record().unwrap() {
        out.push(record);
    }
    out
}

// ===== CSV =====

#[test]
fn test_csv_first_row_is_header() {
    let records = drain(parser_over(b"id,name\n1,Arlo\n2,Basil\n", FileFormat::Csv, b','));
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].doc, doc! { "id": "1", "name": "Arlo" });
    assert_eq!(records[1].doc, doc! { "id": "2", "name": "Basil" });
}

#[test]
fn test_csv_all_leaves_are_strings() {
    let records = drain(parser_over(b"n\n42\n", FileFormat::Csv, b','));
    assert_eq!(records[0].doc.get("n"), Some(&Bson::String("42".into())));
}

#[test]
fn test_csv_custom_delimiter() {
    let records = drain(parser_over(b"id;name\n1;Arlo\n", FileFormat::Csv, b';'));
    assert_eq!(records[0].doc, doc! { "id": "1", "name": "Arlo" });
}

#[test]
fn test_csv_skips_empty_rows() {
    let records = drain(parser_over(b"id,name\n1,Arlo\n,\n2,Basil\n", FileFormat::Csv, b','));
    assert_eq!(records.len(), 2);
}

#[test]
fn test_csv_short_row_omits_trailing_fields() {
    let records = drain(parser_over(b"id,name\n1\n", FileFormat::Csv, b','));
    assert_eq!(records[0].doc, doc! { "id": "1" });
}

#[test]
fn test_csv_bytes_are_tracked() {
    let records = drain(parser_over(b"id,name\n1,Arlo\n2,Basil\n", FileFormat::Csv, b','));
    assert!(records.iter().all(|r| r.bytes > 0));
}

// ===== JSON array =====

#[test]
fn test_json_array_streams_objects() {
    let records = drain(parser_over(
        b"[{\"a\": 1}, {\"a\": 2}, {\"a\": 3}]",
        FileFormat::Json,
        b',',
    ));
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].doc, doc! { "a": 1 });
    assert_eq!(records[2].doc, doc! { "a": 3 });
}

#[test]
fn test_json_array_empty() {
    let records = drain(parser_over(b"[]", FileFormat::Json, b','));
    assert!(records.is_empty());
}

#[test]
fn test_json_array_nested_values() {
    let records = drain(parser_over(
        b"[{\"a\": {\"b\": [1, 2, \"}]\"]}}]",
        FileFormat::Json,
        b',',
    ));
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].doc,
        doc! { "a": { "b": [1, 2, "}]"] } }
    );
}

#[test]
fn test_json_array_resolves_extended_json() {
    let records = drain(parser_over(
        b"[{\"_id\": {\"$oid\": \"5dd080acc15c0d5ee3ab6ad2\"}}]",
        FileFormat::Json,
        b',',
    ));
    let id = records[0].doc.get_object_id("_id").unwrap();
    assert_eq!(id.to_hex(), "5dd080acc15c0d5ee3ab6ad2");
}

#[test]
fn test_json_array_with_bom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"[{\"a\": 1}]");
    let records = drain(parser_over(&bytes, FileFormat::Json, b','));
    assert_eq!(records.len(), 1);
}

#[test]
fn test_json_array_invalid_utf8_is_recoverable() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"[{\"a\": \"");
    bytes.push(0xFF);
    bytes.extend_from_slice(b"\"}, {\"a\": 2}]");
    let mut parser = parser_over(&bytes, FileFormat::Json, b',');
    // The bad element errors instead of being silently mangled
    assert!(parser.next_record().is_err());
    let next = parser.next_record().unwrap().unwrap();
    assert_eq!(next.doc, doc! { "a": 2 });
}

#[test]
fn test_json_array_truncated_is_error() {
    let mut parser = parser_over(b"[{\"a\": 1}", FileFormat::Json, b',');
    assert!(parser.next_record().unwrap().is_some());
    assert!(parser.next_record().is_err());
}

// ===== JSON lines =====

#[test]
fn test_jsonl_one_object_per_line() {
    let records = drain(parser_over(
        b"{\"a\": 1}\n{\"a\": 2}\n",
        FileFormat::JsonLines,
        b',',
    ));
    assert_eq!(records.len(), 2);
}

#[test]
fn test_jsonl_tolerates_blank_lines() {
    let records = drain(parser_over(
        b"{\"a\": 1}\n\n\n{\"a\": 2}\n",
        FileFormat::JsonLines,
        b',',
    ));
    assert_eq!(records.len(), 2);
}

#[test]
fn test_jsonl_malformed_line_is_recoverable() {
    let mut parser = parser_over(
        b"{\"a\": 1}\nnot json\n{\"a\": 3}\n",
        FileFormat::JsonLines,
        b',',
    );
    assert!(parser.next_record().unwrap().is_some());
    assert!(parser.next_record().is_err());
    // The parser is line-based, so it resumes after a bad record
    let third = parser.next_record().unwrap().unwrap();
    assert_eq!(third.doc, doc! { "a": 3 });
}

#[test]
fn test_jsonl_byte_accounting_sums_to_file_size() {
    let input = b"{\"a\": 1}\n{\"bb\": 22}\n";
    let records = drain(parser_over(input, FileFormat::JsonLines, b','));
    let total: u64 = records.iter().map(|r| r.bytes).sum();
    assert_eq!(total, input.len() as u64);
}
