//! Field projection and type coercion.
//!
//! A [`Projection`] is the compiled form of a job's field specs. On
//! import it decides, per dotted leaf path, whether the field is kept and
//! what type its text is cast to; on export it only drops excluded paths
//! (serialization happens in the writers).

use std::collections::HashMap;

use bson::{Bson, Document};

use crate::codec::{self, FieldType};
use crate::config::FieldSpec;
use crate::error::CastError;

/// Compiled projection for one job.
#[derive(Debug, Default)]
pub struct Projection {
    specs: HashMap<String, FieldSpec>,
}

impl Projection {
    /// Compile a field spec list. Paths are unique by construction of
    /// the config surface; a duplicate path keeps the last spec.
    pub fn compile(fields: &[FieldSpec]) -> Self {
        let specs = fields
            .iter()
            .cloned()
            .map(|spec| (spec.path.clone(), spec))
            .collect();
        Self { specs }
    }

    fn spec_for(&self, path: &str) -> Option<&FieldSpec> {
        self.specs.get(path)
    }

    /// Whether `path` or any of its ancestors is excluded.
    fn is_excluded(&self, path: &str) -> bool {
        self.specs.values().any(|spec| {
            !spec.included
                && (spec.path == path
                    || path
                        .strip_prefix(spec.path.as_str())
                        .is_some_and(|rest| rest.starts_with('.')))
        })
    }

    fn declared_type(&self, path: &str) -> Option<FieldType> {
        self.spec_for(path).and_then(|spec| spec.field_type)
    }

    /// Project a flat CSV row into a typed, nested document.
    ///
    /// Dotted header names become nested paths. Cells with a declared
    /// type are cast through the codec; untyped cells stay strings,
    /// except extended-JSON blob cells (arrays and documents exported to
    /// one column), which are reconstructed so round trips are lossless.
    /// Numeric-looking text without a declared type is deliberately left
    /// as a string, to avoid silent precision loss.
    pub fn project_csv_row(&self, row: Document) -> Result<Document, CastError> {
        let mut out = Document::new();
        for (path, value) in row {
            if self.is_excluded(&path) {
                continue;
            }
            let text = match value {
                Bson::String(text) => text,
                // CSV leaves are always strings; anything else passes through
                other => {
                    codec::unflatten_into(&mut out, &path, other);
                    continue;
                }
            };
            let typed = match self.declared_type(&path) {
                Some(tag) => codec::from_text(&text, tag)?,
                None => codec::parse_extjson_blob(&text).unwrap_or(Bson::String(text)),
            };
            codec::unflatten_into(&mut out, &path, typed);
        }
        Ok(out)
    }

    /// Project an already-nested document (JSON import).
    ///
    /// Values arrive typed from extended-JSON resolution; only string
    /// leaves with a declared type are re-cast.
    pub fn project_document(&self, doc: Document) -> Result<Document, CastError> {
        self.walk_import(doc, "")
    }

    fn walk_import(&self, doc: Document, prefix: &str) -> Result<Document, CastError> {
        let mut out = Document::new();
        for (key, value) in doc {
            let path = join_path(prefix, &key);
            if self.is_excluded(&path) {
                continue;
            }
            let projected = match value {
                Bson::Document(inner) => Bson::Document(self.walk_import(inner, &path)?),
                Bson::String(text) => match self.declared_type(&path) {
                    Some(tag) => codec::from_text(&text, tag)?,
                    None => Bson::String(text),
                },
                other => other,
            };
            out.insert(key, projected);
        }
        Ok(out)
    }

    /// Drop excluded paths from an outbound document (export).
    pub fn project_export(&self, doc: &Document) -> Document {
        self.walk_export(doc, "")
    }

    fn walk_export(&self, doc: &Document, prefix: &str) -> Document {
        let mut out = Document::new();
        for (key, value) in doc.iter() {
            let path = join_path(prefix, key);
            if self.is_excluded(&path) {
                continue;
            }
            match value {
                Bson::Document(inner) => {
                    out.insert(key.clone(), Bson::Document(self.walk_export(inner, &path)));
                }
                other => {
                    out.insert(key.clone(), other.clone());
                }
            }
        }
        out
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn test_csv_row_cast_with_declared_types() {
        let projection = Projection::compile(&[
            FieldSpec::typed("_id", FieldType::ObjectId, 0),
            FieldSpec::typed("stats.flufiness", FieldType::Int32, 1),
        ]);
        let row = doc! {
            "_id": "5dd080acc15c0d5ee3ab6ad2",
            "stats.flufiness": "100",
            "name": "Arlo",
        };
        let out = projection.project_csv_row(row).unwrap();
        assert_eq!(
            out,
            doc! {
                "_id": ObjectId::parse_str("5dd080acc15c0d5ee3ab6ad2").unwrap(),
                "stats": { "flufiness": 100 },
                "name": "Arlo",
            }
        );
    }

    #[test]
    fn test_untyped_numeric_text_stays_string() {
        let projection = Projection::compile(&[]);
        let out = projection.project_csv_row(doc! { "n": "42" }).unwrap();
        assert_eq!(out, doc! { "n": "42" });
    }

    #[test]
    fn test_untyped_blob_cell_is_reconstructed() {
        let projection = Projection::compile(&[]);
        let out = projection
            .project_csv_row(doc! { "tags": "[\"a\",\"b\"]" })
            .unwrap();
        assert_eq!(out, doc! { "tags": ["a", "b"] });
    }

    #[test]
    fn test_excluded_fields_dropped() {
        let projection = Projection::compile(&[FieldSpec::excluded("secret", 0)]);
        let out = projection
            .project_csv_row(doc! { "secret": "x", "name": "Arlo" })
            .unwrap();
        assert_eq!(out, doc! { "name": "Arlo" });
    }

    #[test]
    fn test_excluding_a_prefix_drops_the_subtree() {
        let projection = Projection::compile(&[FieldSpec::excluded("location", 0)]);
        let out = projection
            .project_csv_row(doc! { "location.city": "Oslo", "name": "Arlo" })
            .unwrap();
        assert_eq!(out, doc! { "name": "Arlo" });

        let out = projection
            .project_document(doc! { "location": { "city": "Oslo" }, "name": "Arlo" })
            .unwrap();
        assert_eq!(out, doc! { "name": "Arlo" });
    }

    #[test]
    fn test_cast_failure_is_per_record_error() {
        let projection = Projection::compile(&[FieldSpec::typed("n", FieldType::Int32, 0)]);
        let err = projection
            .project_csv_row(doc! { "n": "not a number" })
            .unwrap_err();
        assert_eq!(err.type_tag, "int32");
    }

    #[test]
    fn test_json_document_types_preserved() {
        let projection = Projection::compile(&[]);
        let doc = doc! { "n": 42, "s": "still a string" };
        assert_eq!(projection.project_document(doc.clone()).unwrap(), doc);
    }

    #[test]
    fn test_export_drops_excluded_nested_path() {
        let projection = Projection::compile(&[FieldSpec::excluded("stats.secret", 0)]);
        let doc = doc! { "stats": { "secret": 1, "open": 2 } };
        assert_eq!(
            projection.project_export(&doc),
            doc! { "stats": { "open": 2 } }
        );
    }
}
