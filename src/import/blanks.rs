//! Blank field removal for import.

use bson::{Bson, Document};

/// Drop every leaf whose value is the exact empty string.
///
/// Recurses into nested documents; array contents are left untouched.
/// Applied only on import, and only when `ignore_blanks` is set, so a
/// blank CSV cell means "field absent" rather than `""`.
pub fn remove_blanks(doc: &Document) -> Document {
    let mut out = Document::new();
    for (key, value) in doc.iter() {
        match value {
            Bson::String(s) if s.is_empty() => {}
            Bson::Document(inner) => {
                out.insert(key.clone(), Bson::Document(remove_blanks(inner)));
            }
            other => {
                out.insert(key.clone(), other.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_drops_empty_string_leaves() {
        let doc = doc! { "id": "2", "name": "" };
        assert_eq!(remove_blanks(&doc), doc! { "id": "2" });
    }

    #[test]
    fn test_recurses_into_nested_documents() {
        let doc = doc! { "a": { "b": "", "c": "kept" } };
        assert_eq!(remove_blanks(&doc), doc! { "a": { "c": "kept" } });
    }

    #[test]
    fn test_keeps_non_string_values() {
        let doc = doc! { "n": 0, "b": false, "nil": Bson::Null };
        assert_eq!(remove_blanks(&doc), doc.clone());
    }

    #[test]
    fn test_arrays_left_untouched() {
        let doc = doc! { "tags": ["", "a"] };
        assert_eq!(remove_blanks(&doc), doc.clone());
    }
}
