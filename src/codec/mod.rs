//! Bidirectional mapping between BSON values and flat text.
//!
//! This module is the type codec used by both directions of the pipeline:
//! - `to_text` renders any BSON value as a single flat string (CSV cell)
//! - `from_text` casts flat text back to a typed BSON value for a declared
//!   [`FieldType`]
//! - `flatten_document` / `unflatten_into` translate between nested
//!   documents and dot-path columns
//!
//! Scalar leaves render to their plain text form; arrays and any value
//! without a natural flat form render as a canonical extended-JSON blob so
//! that re-import reconstructs the original value exactly. Nested plain
//! documents do not blob: they flatten into one column per leaf path.

use std::fmt;
use std::str::FromStr;

use bson::{Bson, Document, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::CastError;

#[cfg(test)]
mod tests;

/// Closed set of leaf types a field can be cast to.
///
/// The type set is fixed and small, so coercion is a single enum dispatch
/// rather than an open registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Int32,
    Int64,
    Double,
    Decimal128,
    Boolean,
    Date,
    ObjectId,
    Regex,
    Null,
    Undefined,
}

impl FieldType {
    /// Canonical tag string for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Double => "double",
            FieldType::Decimal128 => "decimal128",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::ObjectId => "objectId",
            FieldType::Regex => "regex",
            FieldType::Null => "null",
            FieldType::Undefined => "undefined",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(FieldType::String),
            "int32" | "int" => Ok(FieldType::Int32),
            "int64" | "long" => Ok(FieldType::Int64),
            "double" => Ok(FieldType::Double),
            "decimal128" | "decimal" => Ok(FieldType::Decimal128),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "date" | "datetime" => Ok(FieldType::Date),
            "objectid" | "oid" => Ok(FieldType::ObjectId),
            "regex" | "regexp" => Ok(FieldType::Regex),
            "null" => Ok(FieldType::Null),
            "undefined" => Ok(FieldType::Undefined),
            other => Err(format!("unknown field type: {other}")),
        }
    }
}

fn cast_error(tag: FieldType, text: &str, reason: impl Into<String>) -> CastError {
    const MAX_TEXT: usize = 64;
    let mut shown = text.to_string();
    if shown.len() > MAX_TEXT {
        shown.truncate(MAX_TEXT);
        shown.push_str("...");
    }
    CastError {
        type_tag: tag.as_str().to_string(),
        text: shown,
        reason: reason.into(),
    }
}

/// Render a BSON value as a single flat text cell.
///
/// Total: never fails. Values without a natural flat representation
/// (arrays, timestamps, binary subtypes other than the common ones) fall
/// back to a canonical extended-JSON blob.
pub fn to_text(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(d) => d.to_string(),
        Bson::Boolean(b) => b.to_string(),
        // "null" and "undefined" stay distinguishable from a blank cell
        Bson::Null => String::from("null"),
        Bson::Undefined => String::from("undefined"),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| dt.timestamp_millis().to_string()),
        Bson::Decimal128(d) => d.to_string(),
        Bson::RegularExpression(re) => format!("/{}/{}", re.pattern, re.options),
        Bson::Binary(bin) => hex::encode(&bin.bytes),
        Bson::Symbol(s) => s.clone(),
        other => extjson_blob(other),
    }
}

/// Serialize any BSON value as a canonical extended-JSON string.
pub fn extjson_blob(value: &Bson) -> String {
    let ejson = value.clone().into_canonical_extjson();
    serde_json::to_string(&ejson).unwrap_or_default()
}

/// Try to reconstruct a typed BSON value from an extended-JSON blob cell.
///
/// Returns `None` unless the text is a complete JSON array or object that
/// deserializes cleanly. Used on import for untyped columns so arrays and
/// documents exported as blobs survive a full round trip.
pub fn parse_extjson_blob(text: &str) -> Option<Bson> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return None;
    }
    let json: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    Bson::try_from(json).ok()
}

/// Cast flat text to a typed BSON value.
///
/// Returns a [`CastError`] for text that is malformed for the declared
/// type. The caller decides whether that is fatal (stop-on-errors) or a
/// skipped record.
pub fn from_text(text: &str, tag: FieldType) -> Result<Bson, CastError> {
    match tag {
        FieldType::String => Ok(Bson::String(text.to_string())),
        FieldType::Int32 => text
            .trim()
            .parse::<i32>()
            .map(Bson::Int32)
            .map_err(|e| cast_error(tag, text, e.to_string())),
        FieldType::Int64 => text
            .trim()
            .parse::<i64>()
            .map(Bson::Int64)
            .map_err(|e| cast_error(tag, text, e.to_string())),
        FieldType::Double => text
            .trim()
            .parse::<f64>()
            .map(Bson::Double)
            .map_err(|e| cast_error(tag, text, e.to_string())),
        FieldType::Decimal128 => text
            .trim()
            .parse::<bson::Decimal128>()
            .map(Bson::Decimal128)
            .map_err(|e| cast_error(tag, text, e.to_string())),
        FieldType::Boolean => parse_boolean(text).map_err(|reason| cast_error(tag, text, reason)),
        FieldType::Date => parse_date(text).map_err(|reason| cast_error(tag, text, reason)),
        FieldType::ObjectId => ObjectId::parse_str(text.trim())
            .map(Bson::ObjectId)
            .map_err(|e| cast_error(tag, text, e.to_string())),
        FieldType::Regex => parse_regex(text).map_err(|reason| cast_error(tag, text, reason)),
        FieldType::Null => match text {
            "" | "null" => Ok(Bson::Null),
            _ => Err(cast_error(tag, text, "expected 'null' or empty")),
        },
        FieldType::Undefined => match text {
            "" | "undefined" => Ok(Bson::Undefined),
            _ => Err(cast_error(tag, text, "expected 'undefined' or empty")),
        },
    }
}

/// Deliberately narrow boolean grammar: case-insensitive `true`/`false`
/// and the empty string (false). `0`/`1`/`yes`/`no` are cast errors, not
/// generic truthy/falsy values.
fn parse_boolean(text: &str) -> Result<Bson, String> {
    if text.is_empty() {
        return Ok(Bson::Boolean(false));
    }
    match text.to_ascii_lowercase().as_str() {
        "true" => Ok(Bson::Boolean(true)),
        "false" => Ok(Bson::Boolean(false)),
        _ => Err(String::from("expected 'true' or 'false'")),
    }
}

/// Parse an RFC-3339 timestamp or a plain `YYYY-MM-DD` date.
///
/// Anything else is an error: dates never silently fall back to strings.
fn parse_date(text: &str) -> Result<Bson, String> {
    let trimmed = text.trim();
    if let Ok(dt) = bson::DateTime::parse_rfc3339_str(trimmed) {
        return Ok(Bson::DateTime(dt));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let millis = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(0);
        return Ok(Bson::DateTime(bson::DateTime::from_millis(millis)));
    }
    Err(String::from("not a valid ISO-8601 date"))
}

/// Parse a `/pattern/flags` regular expression literal.
fn parse_regex(text: &str) -> Result<Bson, String> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(String::from("expected /pattern/flags"));
    }
    let close = trimmed
        .rfind('/')
        .filter(|&i| i > 0)
        .ok_or_else(|| String::from("expected /pattern/flags"))?;
    let pattern = &trimmed[1..close];
    let options = &trimmed[close + 1..];
    Ok(Bson::RegularExpression(bson::Regex {
        pattern: pattern.to_string(),
        options: options.to_string(),
    }))
}

/// Flatten a document into `(dot path, flat text)` columns.
///
/// Nested plain documents recurse into one column per leaf path; arrays
/// stay as a single extended-JSON blob column. Column order is the
/// document's own key order.
pub fn flatten_document(doc: &Document) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(&mut out, String::new(), doc);
    out
}

fn flatten_into(out: &mut Vec<(String, String)>, prefix: String, doc: &Document) {
    for (key, value) in doc.iter() {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Bson::Document(inner) => flatten_into(out, path, inner),
            other => out.push((path, to_text(other))),
        }
    }
}

/// Insert `value` at a dotted `path`, creating intermediate documents.
///
/// An intermediate that already exists but is not a document is replaced;
/// last write wins.
pub fn unflatten_into(doc: &mut Document, path: &str, value: Bson) {
    let mut parts = path.split('.').peekable();
    let mut current = doc;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        if !matches!(current.get(part), Some(Bson::Document(_))) {
            current.insert(part.to_string(), Document::new());
        }
        current = match current.get_mut(part) {
            Some(Bson::Document(inner)) => inner,
            // Unreachable after the insert above
            _ => return,
        };
    }
}

/// Visit every leaf of a document with its dotted path.
///
/// Arrays count as leaves (they serialize as one blob column); nested
/// documents recurse. Visit order is document order.
pub fn for_each_leaf<'a>(doc: &'a Document, mut visit: impl FnMut(&str, &'a Bson)) {
    fn walk<'a>(doc: &'a Document, prefix: &str, visit: &mut impl FnMut(&str, &'a Bson)) {
        for (key, value) in doc.iter() {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                Bson::Document(inner) => walk(inner, &path, visit),
                other => visit(&path, other),
            }
        }
    }
    walk(doc, "", &mut visit);
}
