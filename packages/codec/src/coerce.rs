//! Type coercion between typed field values and storage-native primitives.
//!
//! The store holds flat JSON, so every typed wrapper must flatten on the way
//! out: dates to their ISO-8601 strings, pointers to the referenced
//! identifier, files to the file name, geo points to the store's composite
//! coordinate pair. [`decode`] rehydrates what the schema gives enough
//! context to rehydrate; pointer wrappers are re-attached by the query layer
//! instead, since a bare identifier alone does not determine its wrapper.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use objectdoc_core::{fields, ClassSchema, Document, FieldMap, FieldType};

use crate::CodecError;

/// Members the storage layer owns; they pass through encoding untouched and
/// need no schema declaration.
const RESERVED_PASSTHROUGH: [&str; 5] = [
    fields::OBJECT_ID,
    fields::READ_ACL_ALIAS,
    fields::WRITE_ACL_ALIAS,
    fields::HASHED_PASSWORD_ALIAS,
    fields::AUTH_DATA,
];

/// Encode a typed object into its stored representation.
///
/// `declared` is the class's field map with permission declarations already
/// renamed to their storage aliases (see [`crate::perms::alias_declarations`]),
/// matching an object that went through [`crate::perms::to_storage`].
///
/// Per-provider `_auth_data_<provider>` members fold into a single `authData`
/// map before coercion runs. A field with no declaration fails with
/// [`CodecError::UndeclaredField`]; a declared type with no encoding rule
/// (relations are write-through-relation-API only) fails with
/// [`CodecError::UnsupportedType`].
pub fn encode(object: &Document, declared: &FieldMap) -> Result<Document, CodecError> {
    let object = fold_auth_data(object);
    let mut encoded = Document::new();
    // Geo points need the store's composite representation; hold them aside
    // during the field loop and inject them once the plain fields are done.
    let mut geo_points: Vec<(String, Value)> = Vec::new();

    for (name, value) in &object {
        if RESERVED_PASSTHROUGH.contains(&name.as_str()) && !declared.contains_key(name) {
            encoded.insert(name.clone(), value.clone());
            continue;
        }

        let field_type = declared
            .get(name)
            .ok_or_else(|| CodecError::UndeclaredField {
                field: name.clone(),
            })?;

        match field_type {
            FieldType::Date => {
                encoded.insert(name.clone(), extract(name, value, fields::ISO, "Date")?);
            }
            FieldType::Pointer { .. } => {
                encoded.insert(
                    name.clone(),
                    extract(name, value, fields::OBJECT_ID, "Pointer")?,
                );
            }
            FieldType::File => {
                encoded.insert(name.clone(), extract(name, value, "name", "File")?);
            }
            FieldType::GeoPoint => {
                geo_points.push((name.clone(), encode_geo_point(name, value)?));
            }
            FieldType::Object
            | FieldType::String
            | FieldType::Number
            | FieldType::Boolean
            | FieldType::Array => {
                encoded.insert(name.clone(), value.clone());
            }
            FieldType::Relation { .. } => {
                return Err(CodecError::UnsupportedType {
                    field: name.clone(),
                    type_name: field_type.name().to_string(),
                });
            }
        }
    }

    for (name, point) in geo_points {
        encoded.insert(name, point);
    }

    Ok(encoded)
}

/// Decode one stored document into its typed representation, in place.
///
/// Pointer fields stay bare identifiers; relation fields become typed
/// relation markers carrying the target class; geo points, files and dates
/// are rehydrated into their wrappers; `null` members are dropped rather
/// than retained.
pub fn decode(doc: &mut Document, schema: &ClassSchema) {
    for (name, field_type) in &schema.fields {
        match field_type {
            FieldType::Relation { target_class } => {
                let mut marker = Map::new();
                marker.insert(
                    fields::TYPE_MARKER.to_string(),
                    Value::String("Relation".to_string()),
                );
                marker.insert(
                    "className".to_string(),
                    Value::String(target_class.clone()),
                );
                doc.insert(name.clone(), Value::Object(marker));
            }
            FieldType::GeoPoint => {
                if let Some(point) = doc.get(name).and_then(decode_geo_point) {
                    doc.insert(name.clone(), point);
                }
            }
            FieldType::File => {
                let file_name = doc.get(name).and_then(Value::as_str).map(str::to_string);
                if let Some(file_name) = file_name {
                    let mut wrapper = Map::new();
                    wrapper.insert(
                        fields::TYPE_MARKER.to_string(),
                        Value::String("File".to_string()),
                    );
                    wrapper.insert("name".to_string(), Value::String(file_name));
                    doc.insert(name.clone(), Value::Object(wrapper));
                }
            }
            FieldType::Date => {
                let iso = doc.get(name).and_then(Value::as_str).map(str::to_string);
                if let Some(iso) = iso {
                    let mut wrapper = Map::new();
                    wrapper.insert(
                        fields::TYPE_MARKER.to_string(),
                        Value::String("Date".to_string()),
                    );
                    wrapper.insert(fields::ISO.to_string(), Value::String(iso));
                    doc.insert(name.clone(), Value::Object(wrapper));
                }
            }
            _ => {}
        }
    }

    doc.retain(|_, value| !value.is_null());
}

/// Fold `_auth_data_<provider>` members into a single `authData` map keyed
/// by provider.
fn fold_auth_data(object: &Document) -> Document {
    lazy_static! {
        static ref AUTH_DATA_FIELD: Regex = Regex::new(r"^_auth_data_([a-zA-Z0-9_]+)$").unwrap();
    }

    if !object.keys().any(|name| AUTH_DATA_FIELD.is_match(name)) {
        return object.clone();
    }

    let mut folded = Document::new();
    let mut auth_data = Map::new();
    for (name, value) in object {
        match AUTH_DATA_FIELD.captures(name) {
            Some(captures) => {
                auth_data.insert(captures[1].to_string(), value.clone());
            }
            None => {
                folded.insert(name.clone(), value.clone());
            }
        }
    }
    folded.insert(fields::AUTH_DATA.to_string(), Value::Object(auth_data));
    folded
}

/// Pull `key` out of a typed wrapper value; a bare string is taken as
/// already encoded.
fn extract(field: &str, value: &Value, key: &str, expected: &'static str) -> Result<Value, CodecError> {
    match value {
        Value::Object(wrapper) => wrapper
            .get(key)
            .cloned()
            .ok_or(CodecError::InvalidValue {
                field: field.to_string(),
                expected,
            }),
        Value::String(_) => Ok(value.clone()),
        _ => Err(CodecError::InvalidValue {
            field: field.to_string(),
            expected,
        }),
    }
}

fn encode_geo_point(field: &str, value: &Value) -> Result<Value, CodecError> {
    let invalid = || CodecError::InvalidValue {
        field: field.to_string(),
        expected: "GeoPoint",
    };

    let point = value.as_object().ok_or_else(invalid)?;
    let latitude = point.get("latitude").and_then(Value::as_f64).ok_or_else(invalid)?;
    let longitude = point
        .get("longitude")
        .and_then(Value::as_f64)
        .ok_or_else(invalid)?;

    let mut encoded = Map::new();
    encoded.insert("x".to_string(), Value::from(longitude));
    encoded.insert("y".to_string(), Value::from(latitude));
    Ok(Value::Object(encoded))
}

fn decode_geo_point(value: &Value) -> Option<Value> {
    let point = value.as_object()?;
    let x = point.get("x").and_then(Value::as_f64)?;
    let y = point.get("y").and_then(Value::as_f64)?;

    let mut decoded = Map::new();
    decoded.insert("latitude".to_string(), Value::from(y));
    decoded.insert("longitude".to_string(), Value::from(x));
    Some(Value::Object(decoded))
}
