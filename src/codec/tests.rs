//! Tests for the flat-text type codec

use super::*;
use bson::{Regex, doc};

// ===== to_text =====

#[test]
fn test_scalar_to_text() {
    assert_eq!(to_text(&Bson::String("Arlo".into())), "Arlo");
    assert_eq!(to_text(&Bson::Int32(42)), "42");
    assert_eq!(to_text(&Bson::Int64(245)), "245");
    assert_eq!(to_text(&Bson::Double(79.8911483764648)), "79.8911483764648");
    assert_eq!(to_text(&Bson::Boolean(true)), "true");
    assert_eq!(to_text(&Bson::Boolean(false)), "false");
}

#[test]
fn test_null_and_undefined_stay_distinguishable() {
    // Not empty strings: a blank cell must mean "missing", not null
    assert_eq!(to_text(&Bson::Null), "null");
    assert_eq!(to_text(&Bson::Undefined), "undefined");
}

#[test]
fn test_object_id_to_hex() {
    let oid = ObjectId::parse_str("5dd080acc15c0d5ee3ab6ad2").unwrap();
    assert_eq!(to_text(&Bson::ObjectId(oid)), "5dd080acc15c0d5ee3ab6ad2");
}

#[test]
fn test_regex_to_text() {
    let re = Bson::RegularExpression(Regex {
        pattern: "^mongodb".into(),
        options: "m".into(),
    });
    assert_eq!(to_text(&re), "/^mongodb/m");

    let bare = Bson::RegularExpression(Regex {
        pattern: "^mongodb".into(),
        options: String::new(),
    });
    assert_eq!(to_text(&bare), "/^mongodb/");
}

#[test]
fn test_datetime_to_iso_string() {
    let dt = bson::DateTime::from_millis(1484265600000); // 2017-01-13T00:00:00Z
    let text = to_text(&Bson::DateTime(dt));
    assert!(text.starts_with("2017-01-13T00:00:00"));
}

#[test]
fn test_array_serializes_as_extjson_blob() {
    let a = ObjectId::parse_str("5e6652f22c09c775463d70f1").unwrap();
    let b = ObjectId::parse_str("5e6652f62c09c775463d70f2").unwrap();
    let arr = Bson::Array(vec![Bson::ObjectId(a), Bson::ObjectId(b)]);
    assert_eq!(
        to_text(&arr),
        "[{\"$oid\":\"5e6652f22c09c775463d70f1\"},{\"$oid\":\"5e6652f62c09c775463d70f2\"}]"
    );
}

// ===== from_text =====

#[test]
fn test_boolean_grammar_is_narrow() {
    assert_eq!(from_text("true", FieldType::Boolean).unwrap(), Bson::Boolean(true));
    assert_eq!(from_text("TRUE", FieldType::Boolean).unwrap(), Bson::Boolean(true));
    assert_eq!(from_text("false", FieldType::Boolean).unwrap(), Bson::Boolean(false));
    assert_eq!(from_text("FALSE", FieldType::Boolean).unwrap(), Bson::Boolean(false));
    assert_eq!(from_text("", FieldType::Boolean).unwrap(), Bson::Boolean(false));

    // No generic truthy/falsy parsing
    assert!(from_text("1", FieldType::Boolean).is_err());
    assert!(from_text("yes", FieldType::Boolean).is_err());
}

#[test]
fn test_numeric_casts() {
    assert_eq!(from_text("1", FieldType::Int32).unwrap(), Bson::Int32(1));
    assert_eq!(from_text("245", FieldType::Int64).unwrap(), Bson::Int64(245));
    assert_eq!(
        from_text("79.8911483764648", FieldType::Double).unwrap(),
        Bson::Double(79.8911483764648)
    );
    assert!(from_text("not-a-number", FieldType::Int32).is_err());
}

#[test]
fn test_decimal128_preserves_precision() {
    let d = from_text("9823.1297", FieldType::Decimal128).unwrap();
    assert_eq!(to_text(&d), "9823.1297");
}

#[test]
fn test_object_id_cast() {
    let v = from_text("5dd080acc15c0d5ee3ab6ad2", FieldType::ObjectId).unwrap();
    assert_eq!(
        v,
        Bson::ObjectId(ObjectId::parse_str("5dd080acc15c0d5ee3ab6ad2").unwrap())
    );
    assert!(from_text("not-hex", FieldType::ObjectId).is_err());
    assert!(from_text("5dd080ac", FieldType::ObjectId).is_err());
}

#[test]
fn test_date_cast() {
    let v = from_text("2017-01-13T00:00:00Z", FieldType::Date).unwrap();
    assert_eq!(v, Bson::DateTime(bson::DateTime::from_millis(1484265600000)));

    // Plain dates are accepted, arbitrary text is an error, not a string
    assert!(from_text("2017-01-13", FieldType::Date).is_ok());
    assert!(from_text("last tuesday", FieldType::Date).is_err());
}

#[test]
fn test_regex_round_trip() {
    let v = from_text("/^mongodb/m", FieldType::Regex).unwrap();
    assert_eq!(to_text(&v), "/^mongodb/m");
}

#[test]
fn test_leaf_round_trips() {
    let values = vec![
        Bson::String("hello, world".into()),
        Bson::Int32(-7),
        Bson::Int64(9_000_000_000),
        Bson::Double(1.5),
        Bson::Boolean(true),
        Bson::ObjectId(ObjectId::parse_str("5dd080acc15c0d5ee3ab6ad2").unwrap()),
        Bson::DateTime(bson::DateTime::from_millis(1484265600000)),
        Bson::RegularExpression(Regex {
            pattern: "^a+b".into(),
            options: "i".into(),
        }),
        Bson::Null,
        Bson::Undefined,
    ];
    let tags = vec![
        FieldType::String,
        FieldType::Int32,
        FieldType::Int64,
        FieldType::Double,
        FieldType::Boolean,
        FieldType::ObjectId,
        FieldType::Date,
        FieldType::Regex,
        FieldType::Null,
        FieldType::Undefined,
    ];
    for (value, tag) in values.into_iter().zip(tags) {
        let text = to_text(&value);
        let back = from_text(&text, tag).unwrap();
        assert_eq!(back, value, "round trip failed for {tag}");
    }
}

// ===== blobs =====

#[test]
fn test_extjson_blob_round_trip() {
    let arr = Bson::Array(vec![Bson::Int32(1), Bson::String("two".into())]);
    let blob = to_text(&arr);
    let back = parse_extjson_blob(&blob).unwrap();
    assert_eq!(back, arr);
}

#[test]
fn test_parse_extjson_blob_rejects_scalars() {
    assert!(parse_extjson_blob("123").is_none());
    assert!(parse_extjson_blob("plain text").is_none());
    assert!(parse_extjson_blob("[not json").is_none());
}

// ===== flatten / unflatten =====

#[test]
fn test_nested_documents_flatten_to_dot_paths() {
    let doc = doc! {
        "_id": "arlo",
        "name": "Arlo",
        "location": {
            "activity": {
                "sleeping": "true",
                "is": "on the couch",
            }
        }
    };
    let flat = flatten_document(&doc);
    assert_eq!(
        flat,
        vec![
            ("_id".to_string(), "arlo".to_string()),
            ("name".to_string(), "Arlo".to_string()),
            ("location.activity.sleeping".to_string(), "true".to_string()),
            ("location.activity.is".to_string(), "on the couch".to_string()),
        ]
    );
}

#[test]
fn test_arrays_do_not_flatten() {
    let doc = doc! { "tags": ["a", "b"] };
    let flat = flatten_document(&doc);
    assert_eq!(flat.len(), 1);
    assert_eq!(flat[0].0, "tags");
    assert_eq!(flat[0].1, "[\"a\",\"b\"]");
}

#[test]
fn test_unflatten_builds_nested_documents() {
    let mut doc = Document::new();
    unflatten_into(&mut doc, "stats.flufiness", Bson::Int32(100));
    unflatten_into(&mut doc, "stats.age", Bson::Int32(5));
    unflatten_into(&mut doc, "name", Bson::String("Arlo".into()));
    assert_eq!(
        doc,
        doc! { "stats": { "flufiness": 100, "age": 5 }, "name": "Arlo" }
    );
}

#[test]
fn test_for_each_leaf_order() {
    let doc = doc! { "a": { "b": 1 }, "c": [1, 2], "d": "x" };
    let mut paths = Vec::new();
    for_each_leaf(&doc, |path, _| paths.push(path.to_string()));
    assert_eq!(paths, vec!["a.b", "c", "d"]);
}
